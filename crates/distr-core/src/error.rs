// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - ERROR TYPES
//
// Every fallible path in the distribution core returns DistrError.
// Allocation errors are fatal for the block being processed: the caller
// must discard buffered writes instead of committing them.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistrError {
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    /// An intermediate amount would have gone below zero.
    #[error("negative amount: {0}")]
    NegativeAmount(String),

    #[error("decimal overflow: {0}")]
    Overflow(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("unknown module account: {0}")]
    UnknownModule(String),

    #[error("insufficient funds in module account {module}: need {needed}, have {available}")]
    InsufficientFunds {
        module: String,
        needed: String,
        available: String,
    },

    #[error("invariant broken: {0}")]
    InvariantBroken(String),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("storage transaction aborted: {0}")]
    Transaction(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DistrError>;
