// In crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A logic bug, not an environmental fault. The lifecycle manager must
    /// halt rather than keep running with corrupted state.
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error(transparent)]
    Core(#[from] core_types::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
