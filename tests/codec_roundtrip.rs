use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;
use solong_lottery::{
    decode_billboard, decode_pool,
    layout::{billboard_space, lookup, pool_space},
    AwardRecord, BillboardState, LayoutVariant, LotteryError, PlayerRecord, PoolState, StructureKind,
};

#[derive(Debug, Clone)]
struct RawPool {
    award: u64,
    fund: u64,
    price: u64,
    key: [u8; 32],
    players: Vec<([u8; 32], u16)>,
}

/// Keeps only what `variant` can represent.
fn pool_for(variant: LayoutVariant, raw: RawPool) -> PoolState {
    let key = Pubkey::new_from_array(raw.key);
    let players = raw.players.into_iter().map(|(player, ticket)| PlayerRecord {
        player: Pubkey::new_from_array(player),
        ticket: if variant == LayoutVariant::Genesis { 1 } else { ticket },
    });
    match variant {
        LayoutVariant::Genesis => PoolState {
            fund: raw.fund,
            owner: Some(key),
            players: players.collect(),
            ..PoolState::default()
        },
        LayoutVariant::Priced => PoolState {
            award: raw.award,
            fund: raw.fund,
            price: raw.price,
            players: players.collect(),
            ..PoolState::default()
        },
        LayoutVariant::Current => PoolState {
            award: raw.award,
            fund: raw.fund,
            price: raw.price,
            fee_account: Some(key),
            owner: None,
            players: players.collect(),
        },
    }
}

fn billboard_for(variant: LayoutVariant, raw: Vec<([u8; 32], u64, u8, u64)>) -> BillboardState {
    BillboardState {
        awards: raw
            .into_iter()
            .map(|(account, award, reward_flag, timestamp)| AwardRecord {
                account: Pubkey::new_from_array(account),
                award,
                reward_flag,
                timestamp: (variant != LayoutVariant::Genesis).then_some(timestamp),
            })
            .collect(),
    }
}

fn any_variant() -> impl Strategy<Value = LayoutVariant> {
    prop::sample::select(LayoutVariant::ALL.to_vec())
}

fn any_raw_pool() -> impl Strategy<Value = RawPool> {
    (
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<[u8; 32]>(),
        prop::collection::vec((any::<[u8; 32]>(), any::<u16>()), 0..24),
    )
        .prop_map(|(award, fund, price, key, players)| RawPool {
            award,
            fund,
            price,
            key,
            players,
        })
}

fn any_raw_awards() -> impl Strategy<Value = Vec<([u8; 32], u64, u8, u64)>> {
    prop::collection::vec((any::<[u8; 32]>(), any::<u64>(), any::<u8>(), any::<u64>()), 0..24)
}

proptest! {
    #[test]
    fn pool_round_trips(variant in any_variant(), raw in any_raw_pool()) {
        let pool = pool_for(variant, raw);
        let image = pool.pack(variant).unwrap();
        prop_assert_eq!(decode_pool(Some(&image), variant).unwrap(), Some(pool.clone()));

        let mut blank = vec![0u8; pool_space(variant)];
        pool.pack_into(&mut blank, variant).unwrap();
        prop_assert_eq!(PoolState::unpack(&blank, variant).unwrap(), pool);
    }

    #[test]
    fn billboard_round_trips(variant in any_variant(), raw in any_raw_awards()) {
        let billboard = billboard_for(variant, raw);
        let mut blank = vec![0u8; billboard_space(variant)];
        billboard.pack_into(&mut blank, variant).unwrap();
        prop_assert_eq!(decode_billboard(Some(&blank), variant).unwrap(), Some(billboard));
    }

    #[test]
    fn truncated_pool_is_rejected(variant in any_variant(), raw in any_raw_pool(), cut in 1usize..35) {
        prop_assume!(!raw.players.is_empty());
        let pool = pool_for(variant, raw);
        let image = pool.pack(variant).unwrap();
        let width = lookup(StructureKind::Pool, variant).record_width;
        let cut = cut.min(width);
        let truncated = &image[..image.len() - cut];
        let is_short = matches!(
            PoolState::unpack(truncated, variant),
            Err(LotteryError::BufferTooShort { .. })
        );
        prop_assert!(is_short);
    }

    #[test]
    fn truncated_billboard_is_rejected(variant in any_variant(), raw in any_raw_awards(), keep in 0usize..2000) {
        prop_assume!(!raw.is_empty());
        let billboard = billboard_for(variant, raw);
        let image = billboard.pack(variant).unwrap();
        let keep = keep % image.len();
        let is_short = matches!(
            BillboardState::unpack(&image[..keep], variant),
            Err(LotteryError::BufferTooShort { .. })
        );
        prop_assert!(is_short);
    }
}

#[test]
fn variants_are_not_interchangeable() {
    let pool = PoolState {
        award: 1,
        fund: 2,
        price: 3,
        fee_account: Some(Pubkey::new_unique()),
        owner: None,
        players: vec![PlayerRecord { player: Pubkey::new_unique(), ticket: 4 }],
    };
    let image = pool.pack(LayoutVariant::Current).unwrap();
    let misread = PoolState::unpack(&image, LayoutVariant::Priced);
    assert_ne!(misread.ok(), Some(pool));
}
