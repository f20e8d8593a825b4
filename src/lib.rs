//! Client side of the solong lottery program: instruction builders, account
//! layouts and decoders, plus the RPC glue used by the bundled binaries.

pub mod app_state;
pub mod config;
pub mod error;
pub mod instruction;
pub mod layout;
pub mod rpc;
pub mod state;

pub use error::{LotteryError, LotteryResult};
pub use instruction::{EncodedInstruction, InstructionKind, LotteryInstruction};
pub use layout::{LayoutVariant, StructureKind};
pub use state::{decode_billboard, decode_pool, AwardRecord, BillboardState, PlayerRecord, PoolState};
