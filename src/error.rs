use thiserror::Error;

/// Errors raised by the lottery codec.
///
/// Every variant is local to the call that produced it. Transport failures
/// never show up here, they stay with the RPC layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    #[error("unknown layout variant: {0}")]
    UnknownLayoutVariant(String),

    #[error("amount {0} does not fit in a u64 field")]
    AmountOverflow(String),

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    #[error("too many records: {count} exceeds capacity {capacity}")]
    TooManyRecords { count: usize, capacity: usize },

    #[error("invalid instruction")]
    InvalidInstruction,

    #[error("invalid account encoding: {0}")]
    InvalidAccountEncoding(String),
}

pub type LotteryResult<T> = Result<T, LotteryError>;
