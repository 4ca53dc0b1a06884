// In crates/market-data/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Out-of-order bar: open_time {incoming} is not after {last}")]
    OutOfOrder { incoming: i64, last: i64 },

    #[error("Insufficient data: requested {requested} bars, store holds {available}")]
    InsufficientData { requested: usize, available: usize },

    #[error("Feed error: {0}")]
    Feed(#[from] csv::Error),

    #[error("Feed produced a malformed bar: {0}")]
    MalformedBar(#[from] core_types::Error),

    #[error("Failed to open feed source: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
