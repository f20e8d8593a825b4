//! Pool and billboard account images.
//!
//! Decoding walks the [`Layout`] for the requested variant. Count fields
//! come straight from chain data, so the full record span is bounds-checked
//! before any record is read.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::pubkey::Pubkey;

use crate::{
    error::{LotteryError, LotteryResult},
    layout::{
        self, Field, Layout, LayoutVariant, StructureKind, ACCOUNT, AWARD, FEE, FUND, OWNER, PLAYER,
        PRICE, PUBKEY_LEN, REWARDED, TICKET, TIMESTAMP,
    },
};

/// Ticket count assumed for players in layouts without a ticket field.
pub const IMPLICIT_TICKET: u16 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    pub player: Pubkey,
    pub ticket: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolState {
    /// Zero in layouts without an award field.
    pub award: u64,
    pub fund: u64,
    /// Zero in layouts without a price field.
    pub price: u64,
    pub fee_account: Option<Pubkey>,
    pub owner: Option<Pubkey>,
    pub players: Vec<PlayerRecord>,
}

impl PoolState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn total_tickets(&self) -> u64 {
        self.players.iter().map(|p| u64::from(p.ticket)).sum()
    }

    pub fn ticket_of(&self, player: &Pubkey) -> Option<u16> {
        self.players.iter().find(|p| &p.player == player).map(|p| p.ticket)
    }

    pub fn unpack(data: &[u8], variant: LayoutVariant) -> LotteryResult<Self> {
        let layout = layout::lookup(StructureKind::Pool, variant);
        let count = read_record_count(data, layout)?;

        let player_field = required(layout, layout.record_field(PLAYER), PLAYER)?;
        let ticket_field = layout.record_field(TICKET);

        let mut players = Vec::with_capacity(count);
        for i in 0..count {
            let base = record_base(layout, i, data.len())?;
            let player = read_pubkey(data, base + player_field.offset)?;
            let ticket = match ticket_field {
                Some(field) => read_u16(data, base + field.offset)?,
                None => IMPLICIT_TICKET,
            };
            players.push(PlayerRecord { player, ticket });
        }

        Ok(Self {
            award: read_opt_u64(data, layout.header_field(AWARD))?.unwrap_or_default(),
            fund: read_opt_u64(data, layout.header_field(FUND))?.unwrap_or_default(),
            price: read_opt_u64(data, layout.header_field(PRICE))?.unwrap_or_default(),
            fee_account: read_opt_pubkey(data, layout.header_field(FEE))?,
            owner: read_opt_pubkey(data, layout.header_field(OWNER))?,
            players,
        })
    }

    /// Writes the account image. Fields the variant lacks are skipped.
    pub fn pack_into(&self, dst: &mut [u8], variant: LayoutVariant) -> LotteryResult<()> {
        let layout = layout::lookup(StructureKind::Pool, variant);
        write_record_count(dst, layout, self.players.len())?;

        write_opt_u64(dst, layout.header_field(AWARD), self.award);
        write_opt_u64(dst, layout.header_field(FUND), self.fund);
        write_opt_u64(dst, layout.header_field(PRICE), self.price);
        write_opt_pubkey(dst, layout.header_field(FEE), self.fee_account.unwrap_or_default());
        write_opt_pubkey(dst, layout.header_field(OWNER), self.owner.unwrap_or_default());

        let player_field = required(layout, layout.record_field(PLAYER), PLAYER)?;
        let ticket_field = layout.record_field(TICKET);
        for (i, record) in self.players.iter().enumerate() {
            let base = record_base(layout, i, dst.len())?;
            dst[base..base + layout.record_width].fill(0);
            write_pubkey(dst, base + player_field.offset, &record.player);
            if let Some(field) = ticket_field {
                write_u16(dst, base + field.offset, record.ticket);
            }
        }
        Ok(())
    }

    /// Compact image holding exactly the current players.
    pub fn pack(&self, variant: LayoutVariant) -> LotteryResult<Vec<u8>> {
        let layout = layout::lookup(StructureKind::Pool, variant);
        let mut dst = vec![0u8; image_len(layout, self.players.len())?];
        self.pack_into(&mut dst, variant)?;
        Ok(dst)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AwardRecord {
    pub account: Pubkey,
    pub award: u64,
    /// Raw flag byte, non-zero once the award has been paid out.
    pub reward_flag: u8,
    /// Unix seconds; `None` in undated layouts.
    pub timestamp: Option<u64>,
}

impl AwardRecord {
    pub fn is_rewarded(&self) -> bool {
        self.reward_flag != 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BillboardState {
    pub awards: Vec<AwardRecord>,
}

impl BillboardState {
    pub fn award_count(&self) -> usize {
        self.awards.len()
    }

    pub fn pending_rewards(&self) -> impl Iterator<Item = &AwardRecord> {
        self.awards.iter().filter(|a| !a.is_rewarded())
    }

    pub fn unpack(data: &[u8], variant: LayoutVariant) -> LotteryResult<Self> {
        let layout = layout::lookup(StructureKind::Billboard, variant);
        let count = read_record_count(data, layout)?;

        let account_field = required(layout, layout.record_field(ACCOUNT), ACCOUNT)?;
        let award_field = required(layout, layout.record_field(AWARD), AWARD)?;
        let rewarded_field = required(layout, layout.record_field(REWARDED), REWARDED)?;
        let timestamp_field = layout.record_field(TIMESTAMP);

        let mut awards = Vec::with_capacity(count);
        for i in 0..count {
            let base = record_base(layout, i, data.len())?;
            let timestamp = match timestamp_field {
                Some(field) => Some(read_u64(data, base + field.offset)?),
                None => None,
            };
            awards.push(AwardRecord {
                account: read_pubkey(data, base + account_field.offset)?,
                award: read_u64(data, base + award_field.offset)?,
                reward_flag: read_u8(data, base + rewarded_field.offset)?,
                timestamp,
            });
        }
        Ok(Self { awards })
    }

    pub fn pack_into(&self, dst: &mut [u8], variant: LayoutVariant) -> LotteryResult<()> {
        let layout = layout::lookup(StructureKind::Billboard, variant);
        write_record_count(dst, layout, self.awards.len())?;

        let account_field = required(layout, layout.record_field(ACCOUNT), ACCOUNT)?;
        let award_field = required(layout, layout.record_field(AWARD), AWARD)?;
        let rewarded_field = required(layout, layout.record_field(REWARDED), REWARDED)?;
        let timestamp_field = layout.record_field(TIMESTAMP);

        for (i, record) in self.awards.iter().enumerate() {
            let base = record_base(layout, i, dst.len())?;
            dst[base..base + layout.record_width].fill(0);
            write_pubkey(dst, base + account_field.offset, &record.account);
            write_u64(dst, base + award_field.offset, record.award);
            dst[base + rewarded_field.offset] = record.reward_flag;
            if let Some(field) = timestamp_field {
                write_u64(dst, base + field.offset, record.timestamp.unwrap_or_default());
            }
        }
        Ok(())
    }

    pub fn pack(&self, variant: LayoutVariant) -> LotteryResult<Vec<u8>> {
        let layout = layout::lookup(StructureKind::Billboard, variant);
        let mut dst = vec![0u8; image_len(layout, self.awards.len())?];
        self.pack_into(&mut dst, variant)?;
        Ok(dst)
    }
}

/// `None` means the account does not exist; that is not an error.
pub fn decode_pool(data: Option<&[u8]>, variant: LayoutVariant) -> LotteryResult<Option<PoolState>> {
    data.map(|data| PoolState::unpack(data, variant)).transpose()
}

pub fn decode_billboard(
    data: Option<&[u8]>,
    variant: LayoutVariant,
) -> LotteryResult<Option<BillboardState>> {
    data.map(|data| BillboardState::unpack(data, variant)).transpose()
}

/// Account data as returned by RPC with base64 encoding.
pub fn decode_account_base64(encoded: &str) -> LotteryResult<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| LotteryError::InvalidAccountEncoding(e.to_string()))
}

fn required<'a>(layout: &Layout, field: Option<&'a Field>, name: &str) -> LotteryResult<&'a Field> {
    field.ok_or_else(|| {
        LotteryError::UnknownLayoutVariant(format!("{} has no {:?} field {name}", layout.variant, layout.kind))
    })
}

fn read_record_count(data: &[u8], layout: &Layout) -> LotteryResult<usize> {
    let count = usize::from(read_u16(data, layout.count.offset)?);
    let needed = layout.records_end(count).ok_or(LotteryError::BufferTooShort {
        needed: usize::MAX,
        available: data.len(),
    })?;
    ensure_len(data, needed)?;
    Ok(count)
}

fn record_base(layout: &Layout, index: usize, available: usize) -> LotteryResult<usize> {
    layout.record_offset(index).ok_or(LotteryError::BufferTooShort {
        needed: usize::MAX,
        available,
    })
}

fn write_record_count(dst: &mut [u8], layout: &Layout, count: usize) -> LotteryResult<()> {
    if count > layout.capacity {
        return Err(LotteryError::TooManyRecords {
            count,
            capacity: layout.capacity,
        });
    }
    // capacity is always below u16::MAX
    let needed = image_len(layout, count)?;
    if dst.len() < needed {
        return Err(LotteryError::BufferTooShort {
            needed,
            available: dst.len(),
        });
    }
    write_u16(dst, layout.count.offset, count as u16);
    Ok(())
}

fn image_len(layout: &Layout, count: usize) -> LotteryResult<usize> {
    layout.records_end(count).ok_or(LotteryError::TooManyRecords {
        count,
        capacity: layout.capacity,
    })
}

fn ensure_len(data: &[u8], needed: usize) -> LotteryResult<()> {
    if data.len() < needed {
        return Err(LotteryError::BufferTooShort {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> LotteryResult<[u8; N]> {
    let end = offset.checked_add(N).unwrap_or(usize::MAX);
    ensure_len(data, end)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..end]);
    Ok(out)
}

fn read_u8(data: &[u8], offset: usize) -> LotteryResult<u8> {
    Ok(read_array::<1>(data, offset)?[0])
}

fn read_u16(data: &[u8], offset: usize) -> LotteryResult<u16> {
    read_array(data, offset).map(u16::from_le_bytes)
}

fn read_u64(data: &[u8], offset: usize) -> LotteryResult<u64> {
    read_array(data, offset).map(u64::from_le_bytes)
}

fn read_pubkey(data: &[u8], offset: usize) -> LotteryResult<Pubkey> {
    read_array::<PUBKEY_LEN>(data, offset).map(Pubkey::new_from_array)
}

fn read_opt_u64(data: &[u8], field: Option<&Field>) -> LotteryResult<Option<u64>> {
    field.map(|f| read_u64(data, f.offset)).transpose()
}

fn read_opt_pubkey(data: &[u8], field: Option<&Field>) -> LotteryResult<Option<Pubkey>> {
    field.map(|f| read_pubkey(data, f.offset)).transpose()
}

// Writers assume the caller already checked the image length.

fn write_u16(dst: &mut [u8], offset: usize, value: u16) {
    dst[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(dst: &mut [u8], offset: usize, value: u64) {
    dst[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_pubkey(dst: &mut [u8], offset: usize, value: &Pubkey) {
    dst[offset..offset + PUBKEY_LEN].copy_from_slice(value.as_ref());
}

fn write_opt_u64(dst: &mut [u8], field: Option<&Field>, value: u64) {
    if let Some(f) = field {
        write_u64(dst, f.offset, value);
    }
}

fn write_opt_pubkey(dst: &mut [u8], field: Option<&Field>, value: Pubkey) {
    if let Some(f) = field {
        write_pubkey(dst, f.offset, &value);
    }
}
