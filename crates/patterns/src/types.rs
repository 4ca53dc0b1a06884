// In crates/patterns/src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorSettings {
    // How many neighbors on EACH side a bar must dominate to count as a
    // swing point. A symmetric comparator window, not a previous-bar check.
    pub swing_strength: usize,

    // The bounded trailing window detection re-runs over on every new bar.
    pub trailing_window: usize,

    // ATR period used to normalize pattern strength against local volatility.
    pub atr_period: u32,

    // A bar qualifies as an order-block origin when its body exceeds this
    // multiple of the average body in the window.
    pub ob_body_multiplier: f64,

    // How many bars after the origin the retracement has to confirm in.
    pub ob_confirm_bars: usize,

    // How many bars after a breach of a swing extreme the close has to come
    // back inside for a liquidity sweep.
    pub sweep_confirm_bars: usize,
}
