// In crates/scoring/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Scorer unavailable: no model is loaded")]
    ScorerUnavailable,

    #[error("Model artifact has {actual} weights, the feature contract requires {expected}")]
    ModelShape { expected: usize, actual: usize },

    #[error("Failed to read model artifact: {0}")]
    ModelRead(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    ModelParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
