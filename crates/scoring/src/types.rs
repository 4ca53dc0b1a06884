// In crates/scoring/src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScorerSettings {
    // Path to the trained model artifact (JSON: feature_names, weights, bias).
    pub model_path: String,

    // Indicator periods feeding the feature vector.
    pub rsi_period: u32,
    pub atr_period: u32,
    pub momentum_period: u32,
}
