use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use tokio::sync::RwLock;

use crate::{
    instruction::InstructionKind,
    state::{AwardRecord, BillboardState, PlayerRecord, PoolState},
};

/// Latest decoded snapshots. `None` while the account does not exist.
#[derive(Clone, Default)]
pub struct AppState {
    pub pool: Arc<RwLock<Option<AppPool>>>,
    pub billboard: Arc<RwLock<Option<AppBillboard>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPlayer {
    pub player: String,
    pub ticket: u16,
}

impl From<PlayerRecord> for AppPlayer {
    fn from(p: PlayerRecord) -> Self {
        AppPlayer {
            player: p.player.to_string(),
            ticket: p.ticket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPool {
    /// Lamports awarded in the last roll.
    pub award: u64,

    /// Lamports held by the pool.
    pub fund: u64,

    /// Ticket price in lamports.
    pub price: u64,

    pub fee_account: Option<String>,
    pub owner: Option<String>,
    pub player_count: usize,
    pub total_tickets: u64,
    pub players: Vec<AppPlayer>,
}

impl From<PoolState> for AppPool {
    fn from(pool: PoolState) -> Self {
        AppPool {
            award: pool.award,
            fund: pool.fund,
            price: pool.price,
            fee_account: pool.fee_account.map(|k| k.to_string()),
            owner: pool.owner.map(|k| k.to_string()),
            player_count: pool.player_count(),
            total_tickets: pool.total_tickets(),
            players: pool.players.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAward {
    pub account: String,
    pub award: u64,
    pub rewarded: bool,
    pub timestamp: Option<u64>,
    /// RFC 3339 rendering of `timestamp`.
    pub awarded_at: Option<String>,
}

impl From<AwardRecord> for AppAward {
    fn from(a: AwardRecord) -> Self {
        let awarded_at = a
            .timestamp
            .and_then(|ts| i64::try_from(ts).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.to_rfc3339());
        AppAward {
            account: a.account.to_string(),
            award: a.award,
            rewarded: a.is_rewarded(),
            timestamp: a.timestamp,
            awarded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBillboard {
    pub award_count: usize,
    pub pending_rewards: usize,
    pub awards: Vec<AppAward>,
}

impl From<BillboardState> for AppBillboard {
    fn from(b: BillboardState) -> Self {
        AppBillboard {
            award_count: b.award_count(),
            pending_rewards: b.pending_rewards().count(),
            awards: b.awards.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Unsigned instruction handed to an external wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInstruction {
    pub kind: InstructionKind,
    pub program_id: String,
    pub accounts: Vec<AppAccountMeta>,
    /// Base64 payload.
    pub data: String,
}

impl AppInstruction {
    pub fn new(kind: InstructionKind, ix: &Instruction) -> Self {
        AppInstruction {
            kind,
            program_id: ix.program_id.to_string(),
            accounts: ix
                .accounts
                .iter()
                .map(|m| AppAccountMeta {
                    pubkey: m.pubkey.to_string(),
                    is_signer: m.is_signer,
                    is_writable: m.is_writable,
                })
                .collect(),
            data: STANDARD.encode(&ix.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::pubkey::Pubkey;

    use super::*;
    use crate::instruction;

    #[test]
    fn award_timestamp_renders_as_rfc3339() {
        let award = AppAward::from(AwardRecord {
            account: Pubkey::default(),
            award: 5,
            reward_flag: 1,
            timestamp: Some(1_608_273_769),
        });
        assert!(award.rewarded);
        assert_eq!(award.awarded_at.as_deref(), Some("2020-12-18T06:42:49+00:00"));

        let undated = AppAward::from(AwardRecord::default());
        assert_eq!(undated.awarded_at, None);
        assert!(!undated.rewarded);
    }

    #[test]
    fn pool_snapshot_counts_tickets() {
        let player = Pubkey::new_unique();
        let pool = AppPool::from(PoolState {
            fund: 10,
            players: vec![
                PlayerRecord { player, ticket: 2 },
                PlayerRecord { player: Pubkey::new_unique(), ticket: 3 },
            ],
            ..PoolState::default()
        });
        assert_eq!(pool.player_count, 2);
        assert_eq!(pool.total_tickets, 5);
        assert_eq!(pool.players[0].player, player.to_string());
        assert_eq!(pool.fee_account, None);
    }

    #[test]
    fn instruction_json_keeps_key_order() {
        let (player, pool, program) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let ix = instruction::sign(player, pool, program);
        let json = AppInstruction::new(InstructionKind::Sign, &ix);
        assert_eq!(json.data, "Ag==");
        assert_eq!(json.accounts[0].pubkey, player.to_string());
        assert!(json.accounts[0].is_signer);
        assert!(!json.accounts[1].is_signer);
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["kind"], "sign");
    }
}
