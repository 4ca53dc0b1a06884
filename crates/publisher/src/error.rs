// In crates/publisher/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Persistence fault: failed to write {file} after {attempts} attempts")]
    PersistenceFault { file: String, attempts: u32 },

    #[error("Failed to read persisted state: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt persisted state: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
