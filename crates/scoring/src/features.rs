// In crates/scoring/src/features.rs

use crate::types::ScorerSettings;
use core_types::{Bar, CandidatePattern, Direction, PatternKind};
use rust_decimal::prelude::*;
use ta::indicators::{AverageTrueRange, RateOfChange, RelativeStrengthIndex};
use ta::{DataItem, Next};

/// The fixed length of every feature vector. Length and field order are part
/// of the extractor contract; the trained model is fitted against exactly
/// this layout.
pub const FEATURE_COUNT: usize = 12;

/// A fixed-length, fixed-order numeric description of one candidate pattern
/// in its surrounding market context.
///
/// Field order:
///  0..=3  pattern kind one-hot (swing high, swing low, order block, sweep)
///  4      bias sign (+1 bullish, -1 bearish)
///  5      raw pattern strength
///  6      span length as a fraction of the window
///  7      volatility (ATR relative to the last close)
///  8      momentum (rate of change of the close, percent)
///  9      RSI of the window closes
/// 10      distance from the last close to the pattern extreme, in ATR units
/// 11      span volume relative to the window average
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Derives a `FeatureVector` from a candidate pattern and the window it was
/// detected in.
///
/// This is a pure function of its inputs and never fails on well-formed
/// input. A pattern whose span falls outside the window is a contract
/// violation by the detector and trips an assertion rather than returning an
/// error.
#[derive(Debug)]
pub struct FeatureExtractor {
    settings: ScorerSettings,
}

impl FeatureExtractor {
    pub fn new(settings: ScorerSettings) -> Self {
        if settings.rsi_period < 1 || settings.atr_period < 1 || settings.momentum_period < 1 {
            panic!("Indicator periods must be greater than 0.");
        }
        Self { settings }
    }

    pub fn extract(&self, pattern: &CandidatePattern, bars: &[Bar]) -> FeatureVector {
        assert!(!bars.is_empty(), "Feature extraction over an empty window.");
        assert!(
            pattern.span.0 <= pattern.span.1 && pattern.span.1 < bars.len(),
            "Pattern span {:?} outside window of {} bars.",
            pattern.span,
            bars.len()
        );

        let closes: Vec<f64> = bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();
        let last_close = *closes.last().unwrap();

        let kind_one_hot = |kind| if pattern.kind == kind { 1.0 } else { 0.0 };
        let bias_sign = match pattern.bias {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        };

        let span_len = (pattern.span.1 - pattern.span.0 + 1) as f64 / bars.len() as f64;

        let atr = self.window_atr(bars);
        let volatility = if last_close > 0.0 { atr / last_close } else { 0.0 };

        let mut roc = RateOfChange::new(self.settings.momentum_period as usize).unwrap();
        let mut rsi = RelativeStrengthIndex::new(self.settings.rsi_period as usize).unwrap();
        let mut momentum = 0.0;
        let mut rsi_value = 50.0;
        for close in &closes {
            momentum = roc.next(*close);
            rsi_value = rsi.next(*close);
        }

        let span_bars = &bars[pattern.span.0..=pattern.span.1];
        let extreme = match pattern.bias {
            Direction::Buy => span_bars
                .iter()
                .map(|b| b.low.to_f64().unwrap_or(0.0))
                .fold(f64::MAX, f64::min),
            Direction::Sell => span_bars
                .iter()
                .map(|b| b.high.to_f64().unwrap_or(0.0))
                .fold(f64::MIN, f64::max),
        };
        let distance_to_extreme = if atr > f64::EPSILON {
            (last_close - extreme).abs() / atr
        } else {
            0.0
        };

        let window_volume: f64 = bars
            .iter()
            .map(|b| b.volume.to_f64().unwrap_or(0.0))
            .sum::<f64>()
            / bars.len() as f64;
        let span_volume: f64 = span_bars
            .iter()
            .map(|b| b.volume.to_f64().unwrap_or(0.0))
            .sum::<f64>()
            / span_bars.len() as f64;
        let volume_ratio = if window_volume > 0.0 {
            span_volume / window_volume
        } else {
            1.0
        };

        FeatureVector([
            kind_one_hot(PatternKind::SwingHigh),
            kind_one_hot(PatternKind::SwingLow),
            kind_one_hot(PatternKind::OrderBlock),
            kind_one_hot(PatternKind::LiquiditySweep),
            bias_sign,
            pattern.strength,
            span_len,
            volatility,
            momentum,
            rsi_value,
            distance_to_extreme,
            volume_ratio,
        ])
    }

    fn window_atr(&self, bars: &[Bar]) -> f64 {
        let mut atr = AverageTrueRange::new(self.settings.atr_period as usize).unwrap();
        let mut current = 0.0;
        for bar in bars {
            let item = DataItem::builder()
                .high(bar.high.to_f64().unwrap_or(0.0))
                .low(bar.low.to_f64().unwrap_or(0.0))
                .close(bar.close.to_f64().unwrap_or(0.0))
                .open(bar.open.to_f64().unwrap_or(0.0))
                .volume(bar.volume.to_f64().unwrap_or(0.0))
                .build()
                .unwrap();
            current = atr.next(&item);
        }
        current
    }
}
