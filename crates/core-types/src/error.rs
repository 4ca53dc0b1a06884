// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Confidence grade {0} is outside the 1-10 scale")]
    InvalidConfidence(u8),

    #[error("Malformed bar: {0}")]
    InvalidBar(String),
}

pub type Result<T> = std::result::Result<T, Error>;
