//! Instruction builders for the lottery program.
//!
//! Payload: one tag byte followed by zero or more little-endian u64 amounts.
//! Account lists target the canonical program revision
//! ([`LayoutVariant::Current`](crate::layout::LayoutVariant::Current)); the
//! program does not validate order client-side, so these lists are the
//! contract.

use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::error::{LotteryError, LotteryResult};

pub type AccountRef = AccountMeta;
pub type EncodedInstruction = Instruction;

pub const INITIALIZE_TAG: u8 = 1;
pub const SIGN_TAG: u8 = 2;
pub const BUY_TAG: u8 = 3;
pub const ROLL_TAG: u8 = 4;
pub const REWARD_TAG: u8 = 5;
/// Admin reconfiguration shares its tag with `Buy`, told apart by payload length.
pub const GM_TAG: u8 = 3;

pub const AMOUNT_LEN: usize = 8;
pub const TAG_ONLY_IX_LEN: usize = 1;
pub const FUND_PRICE_IX_LEN: usize = 1 + AMOUNT_LEN + AMOUNT_LEN;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    Initialize,
    Sign,
    Buy,
    Roll,
    Reward,
    /// Deprecated admin instruction from an earlier program revision.
    Gm,
}

impl InstructionKind {
    pub const ALL: [Self; 6] = [
        Self::Initialize,
        Self::Sign,
        Self::Buy,
        Self::Roll,
        Self::Reward,
        Self::Gm,
    ];

    pub fn tag(self) -> u8 {
        match self {
            Self::Initialize => INITIALIZE_TAG,
            Self::Sign => SIGN_TAG,
            Self::Buy => BUY_TAG,
            Self::Roll => ROLL_TAG,
            Self::Reward => REWARD_TAG,
            Self::Gm => GM_TAG,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Sign => "sign",
            Self::Buy => "buy",
            Self::Roll => "roll",
            Self::Reward => "reward",
            Self::Gm => "gm",
        }
    }
}

impl std::str::FromStr for InstructionKind {
    type Err = LotteryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(LotteryError::InvalidInstruction)
    }
}

/// Typed payload of a lottery instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LotteryInstruction {
    Initialize { fund: u64, price: u64 },
    Sign,
    Buy,
    Roll,
    Reward,
    Gm { fund: u64, price: u64 },
}

impl LotteryInstruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            Self::Initialize { .. } => InstructionKind::Initialize,
            Self::Sign => InstructionKind::Sign,
            Self::Buy => InstructionKind::Buy,
            Self::Roll => InstructionKind::Roll,
            Self::Reward => InstructionKind::Reward,
            Self::Gm { .. } => InstructionKind::Gm,
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        match *self {
            Self::Initialize { fund, price } | Self::Gm { fund, price } => {
                let mut buf = Vec::with_capacity(FUND_PRICE_IX_LEN);
                buf.push(self.kind().tag());
                buf.extend_from_slice(&encode_amount(fund));
                buf.extend_from_slice(&encode_amount(price));
                buf
            }
            Self::Sign | Self::Buy | Self::Roll | Self::Reward => vec![self.kind().tag()],
        }
    }

    /// Trailing bytes beyond what a tag declares are rejected.
    pub fn unpack(input: &[u8]) -> LotteryResult<Self> {
        let (&tag, rest) = input.split_first().ok_or(LotteryError::InvalidInstruction)?;
        Ok(match (tag, rest.len()) {
            (INITIALIZE_TAG, 16) => {
                let (fund, price) = unpack_fund_price(rest)?;
                Self::Initialize { fund, price }
            }
            (SIGN_TAG, 0) => Self::Sign,
            (BUY_TAG, 0) => Self::Buy,
            (GM_TAG, 16) => {
                let (fund, price) = unpack_fund_price(rest)?;
                Self::Gm { fund, price }
            }
            (ROLL_TAG, 0) => Self::Roll,
            (REWARD_TAG, 0) => Self::Reward,
            _ => return Err(LotteryError::InvalidInstruction),
        })
    }
}

fn unpack_fund_price(rest: &[u8]) -> LotteryResult<(u64, u64)> {
    let fund = read_amount(rest, 0)?;
    let price = read_amount(rest, AMOUNT_LEN)?;
    Ok((fund, price))
}

fn read_amount(data: &[u8], offset: usize) -> LotteryResult<u64> {
    data.get(offset..offset + AMOUNT_LEN)
        .and_then(|slice| slice.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(LotteryError::InvalidInstruction)
}

pub fn decode_discriminant(payload: &[u8]) -> LotteryResult<InstructionKind> {
    LotteryInstruction::unpack(payload).map(|ix| ix.kind())
}

pub fn encode_amount(amount: u64) -> [u8; AMOUNT_LEN] {
    amount.to_le_bytes()
}

pub fn amount_from_u128(value: u128) -> LotteryResult<u64> {
    u64::try_from(value).map_err(|_| LotteryError::AmountOverflow(value.to_string()))
}

/// Parses a decimal lamport amount.
pub fn parse_amount(input: &str) -> LotteryResult<u64> {
    let digits = input.trim().replace('_', "");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LotteryError::InvalidAmount(input.to_string()));
    }
    match digits.parse::<u128>() {
        Ok(value) => amount_from_u128(value),
        // Only digits left, so the only failure is magnitude.
        Err(_) => Err(LotteryError::AmountOverflow(digits)),
    }
}

/// Keys: owner(W), fee(W), pool(W), billboard(W).
pub fn initialize(
    owner: Pubkey,
    fee: Pubkey,
    billboard: Pubkey,
    pool: Pubkey,
    program_id: Pubkey,
    fund: u64,
    price: u64,
) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(owner, false),
            AccountMeta::new(fee, false),
            AccountMeta::new(pool, false),
            AccountMeta::new(billboard, false),
        ],
        data: LotteryInstruction::Initialize { fund, price }.pack(),
    }
}

/// Keys: player(S,W), pool(W).
pub fn sign(player: Pubkey, pool: Pubkey, program_id: Pubkey) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![AccountMeta::new(player, true), AccountMeta::new(pool, false)],
        data: LotteryInstruction::Sign.pack(),
    }
}

/// Keys: system program(W), player(S,W), fee(W), pool(W).
pub fn buy(player: Pubkey, fee: Pubkey, pool: Pubkey, program_id: Pubkey) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(system_program::ID, false),
            AccountMeta::new(player, true),
            AccountMeta::new(fee, false),
            AccountMeta::new(pool, false),
        ],
        data: LotteryInstruction::Buy.pack(),
    }
}

/// Keys: clock sysvar(W), admin(S,W), pool(W), billboard(W).
pub fn roll(admin: Pubkey, pool: Pubkey, billboard: Pubkey, program_id: Pubkey) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(sysvar::clock::ID, false),
            AccountMeta::new(admin, true),
            AccountMeta::new(pool, false),
            AccountMeta::new(billboard, false),
        ],
        data: LotteryInstruction::Roll.pack(),
    }
}

/// Keys: system program(W), admin(S,W), player(W), billboard(W).
pub fn reward(admin: Pubkey, player: Pubkey, billboard: Pubkey, program_id: Pubkey) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(system_program::ID, false),
            AccountMeta::new(admin, true),
            AccountMeta::new(player, false),
            AccountMeta::new(billboard, false),
        ],
        data: LotteryInstruction::Reward.pack(),
    }
}

/// Keys: admin(S,W), pool(W).
pub fn gm(admin: Pubkey, pool: Pubkey, program_id: Pubkey, fund: u64, price: u64) -> EncodedInstruction {
    Instruction {
        program_id,
        accounts: vec![AccountMeta::new(admin, true), AccountMeta::new(pool, false)],
        data: LotteryInstruction::Gm { fund, price }.pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    fn flags(ix: &Instruction) -> Vec<(Pubkey, bool, bool)> {
        ix.accounts
            .iter()
            .map(|m| (m.pubkey, m.is_signer, m.is_writable))
            .collect()
    }

    #[test]
    fn sign_scenario() {
        let ix = sign(key(1), key(2), key(9));
        assert_eq!(ix.program_id, key(9));
        assert_eq!(ix.data, vec![0x02]);
        assert_eq!(flags(&ix), vec![(key(1), true, true), (key(2), false, true)]);
    }

    #[test]
    fn initialize_golden_vector() {
        let ix = initialize(key(1), key(2), key(3), key(4), key(9), 1, 256);
        assert_eq!(
            flags(&ix),
            vec![
                (key(1), false, true),
                (key(2), false, true),
                (key(4), false, true),
                (key(3), false, true),
            ]
        );
        let mut expect = vec![1u8];
        expect.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        expect.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ix.data, expect);
    }

    #[test]
    fn buy_golden_vector() {
        let ix = buy(key(1), key(2), key(3), key(9));
        assert_eq!(ix.data, vec![3]);
        assert_eq!(
            flags(&ix),
            vec![
                (system_program::ID, false, true),
                (key(1), true, true),
                (key(2), false, true),
                (key(3), false, true),
            ]
        );
    }

    #[test]
    fn roll_golden_vector() {
        let ix = roll(key(1), key(2), key(3), key(9));
        assert_eq!(ix.data, vec![4]);
        assert_eq!(
            flags(&ix),
            vec![
                (sysvar::clock::ID, false, true),
                (key(1), true, true),
                (key(2), false, true),
                (key(3), false, true),
            ]
        );
    }

    #[test]
    fn reward_golden_vector() {
        let ix = reward(key(1), key(2), key(3), key(9));
        assert_eq!(ix.data, vec![5]);
        assert_eq!(
            flags(&ix),
            vec![
                (system_program::ID, false, true),
                (key(1), true, true),
                (key(2), false, true),
                (key(3), false, true),
            ]
        );
    }

    #[test]
    fn well_known_accounts_are_writable_non_signers() {
        let built = [
            buy(key(1), key(2), key(3), key(9)),
            roll(key(1), key(2), key(3), key(9)),
            reward(key(1), key(2), key(3), key(9)),
        ];
        for ix in built {
            let first = &ix.accounts[0];
            assert!(first.pubkey == system_program::ID || first.pubkey == sysvar::clock::ID);
            assert!(first.is_writable);
            assert!(!first.is_signer);
        }
    }

    #[test]
    fn gm_golden_vector() {
        let ix = gm(key(1), key(2), key(9), 10_000_000_000, 7);
        assert_eq!(flags(&ix), vec![(key(1), true, true), (key(2), false, true)]);
        assert_eq!(ix.data.len(), FUND_PRICE_IX_LEN);
        assert_eq!(&ix.data[1..9], &[0, 228, 11, 84, 2, 0, 0, 0]);
        assert_eq!(&ix.data[9..], &[7, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn discriminant_is_stable_for_every_kind() {
        let built = [
            (InstructionKind::Initialize, initialize(key(1), key(2), key(3), key(4), key(9), 5, 6)),
            (InstructionKind::Sign, sign(key(1), key(2), key(9))),
            (InstructionKind::Buy, buy(key(1), key(2), key(3), key(9))),
            (InstructionKind::Roll, roll(key(1), key(2), key(3), key(9))),
            (InstructionKind::Reward, reward(key(1), key(2), key(3), key(9))),
            (InstructionKind::Gm, gm(key(1), key(2), key(9), 5, 6)),
        ];
        for (kind, ix) in built {
            assert_eq!(ix.data[0], kind.tag());
            assert_eq!(decode_discriminant(&ix.data).unwrap(), kind);
        }
    }

    #[test]
    fn unpack_restores_amounts() {
        let packed = LotteryInstruction::Initialize { fund: u64::MAX, price: 42 }.pack();
        assert_eq!(
            LotteryInstruction::unpack(&packed).unwrap(),
            LotteryInstruction::Initialize { fund: u64::MAX, price: 42 }
        );
    }

    #[test]
    fn unpack_rejects_malformed_payloads() {
        for bad in [&[][..], &[0][..], &[6][..], &[1, 0, 0][..], &[2, 0][..], &[3, 1, 2][..]] {
            assert_eq!(LotteryInstruction::unpack(bad), Err(LotteryError::InvalidInstruction));
        }
    }

    #[test]
    fn amounts_encode_little_endian() {
        assert_eq!(encode_amount(1), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_amount(256), [0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn amount_parsing_reports_overflow() {
        assert_eq!(parse_amount("1_000_000_000"), Ok(1_000_000_000));
        assert_eq!(parse_amount("18446744073709551615"), Ok(u64::MAX));
        assert!(matches!(parse_amount("18446744073709551616"), Err(LotteryError::AmountOverflow(_))));
        assert!(matches!(
            parse_amount("999999999999999999999999999999999999999999"),
            Err(LotteryError::AmountOverflow(_))
        ));
        assert!(matches!(parse_amount("-1"), Err(LotteryError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(LotteryError::InvalidAmount(_))));
        assert_eq!(amount_from_u128(u64::MAX as u128 + 1), Err(LotteryError::AmountOverflow("18446744073709551616".into())));
    }

    #[test]
    fn kind_parses_from_name() {
        assert_eq!("Reward".parse::<InstructionKind>().unwrap(), InstructionKind::Reward);
        assert!("draw".parse::<InstructionKind>().is_err());
    }
}
