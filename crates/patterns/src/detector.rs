// In crates/patterns/src/detector.rs

use crate::types::DetectorSettings;
use core_types::{Bar, CandidatePattern, Direction, PatternKind};
use rust_decimal::prelude::*;
use ta::indicators::AverageTrueRange;
use ta::{DataItem, Next};

/// Scans a bounded trailing window of bars for structural patterns: swing
/// points, order blocks, and liquidity sweeps.
///
/// Detection is a pure function of the window it is given: re-running it on
/// an unchanged window yields the same candidates, which keeps per-tick cost
/// bounded and the output idempotent.
#[derive(Debug)]
pub struct PatternDetector {
    settings: DetectorSettings,
}

/// A confirmed swing point, kept internally so sweeps can be checked against
/// prior extremes.
#[derive(Debug, Clone, Copy)]
struct SwingPoint {
    index: usize,
    price: f64,
    kind: PatternKind,
}

impl PatternDetector {
    /// Creates a new `PatternDetector` instance from its settings.
    pub fn new(settings: DetectorSettings) -> Self {
        if settings.swing_strength < 1 || settings.atr_period < 1 {
            panic!("Detector periods must be greater than 0.");
        }
        if settings.ob_body_multiplier <= 0.0 {
            panic!("Order-block body multiplier must be positive.");
        }
        if settings.ob_confirm_bars < 1 || settings.sweep_confirm_bars < 1 {
            panic!("Confirmation windows must be greater than 0.");
        }
        Self { settings }
    }

    /// Runs one detection pass over the window and returns every candidate
    /// found. Multiple simultaneous candidates are allowed; selecting among
    /// them is the lifecycle manager's job.
    pub fn detect(&self, bars: &[Bar]) -> Vec<CandidatePattern> {
        let k = self.settings.swing_strength;
        let required = (2 * k + 1).max(self.settings.atr_period as usize + 1);
        if bars.len() < required {
            return Vec::new();
        }

        let highs: Vec<f64> = bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();
        let opens: Vec<f64> = bars.iter().map(|b| b.open.to_f64().unwrap_or(0.0)).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();

        let atr = self.current_atr(bars);
        if atr <= f64::EPSILON {
            // A dead-flat window has no structure worth scoring.
            return Vec::new();
        }

        let swings = self.find_swings(&highs, &lows);
        let mut candidates = Vec::new();

        for swing in &swings {
            let margin = match swing.kind {
                PatternKind::SwingHigh => {
                    let neighbors = neighbor_max(&highs, swing.index, k);
                    swing.price - neighbors
                }
                _ => {
                    let neighbors = neighbor_min(&lows, swing.index, k);
                    neighbors - swing.price
                }
            };
            candidates.push(CandidatePattern {
                kind: swing.kind,
                span: (swing.index - k, swing.index + k),
                bias: match swing.kind {
                    PatternKind::SwingHigh => Direction::Sell,
                    _ => Direction::Buy,
                },
                strength: margin / atr,
            });
        }

        self.find_order_blocks(&opens, &highs, &lows, &closes, atr, &mut candidates);
        self.find_liquidity_sweeps(&highs, &lows, &closes, &swings, atr, &mut candidates);

        candidates
    }

    /// ATR over the window, used to normalize every strength score.
    fn current_atr(&self, bars: &[Bar]) -> f64 {
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

    /// Locates local extrema with a symmetric comparator window: bar `i` is a
    /// swing high (low) only when its high (low) strictly dominates the
    /// `swing_strength` neighbors on BOTH sides. The symmetry is what filters
    /// out single-bar noise.
    fn find_swings(&self, highs: &[f64], lows: &[f64]) -> Vec<SwingPoint> {
        let k = self.settings.swing_strength;
        let mut swings = Vec::new();

        for i in k..highs.len() - k {
            if highs[i] > neighbor_max(highs, i, k) {
                swings.push(SwingPoint {
                    index: i,
                    price: highs[i],
                    kind: PatternKind::SwingHigh,
                });
            }
            if lows[i] < neighbor_min(lows, i, k) {
                swings.push(SwingPoint {
                    index: i,
                    price: lows[i],
                    kind: PatternKind::SwingLow,
                });
            }
        }

        swings
    }

    /// An order block is a strong directional bar whose retracement touches
    /// the origin close but never exceeds the origin extreme within the
    /// confirmation window.
    fn find_order_blocks(
        &self,
        opens: &[f64],
        highs: &[f64],
        lows: &[f64],
        closes: &[f64],
        atr: f64,
        candidates: &mut Vec<CandidatePattern>,
    ) {
        let len = closes.len();
        let avg_body: f64 = opens
            .iter()
            .zip(closes)
            .map(|(o, c)| (c - o).abs())
            .sum::<f64>()
            / len as f64;
        if avg_body <= f64::EPSILON {
            return;
        }
        let min_body = avg_body * self.settings.ob_body_multiplier;

        for i in 0..len - 1 {
            let body = (closes[i] - opens[i]).abs();
            if body <= min_body {
                continue;
            }

            let end = (i + self.settings.ob_confirm_bars).min(len - 1);
            let confirm = i + 1..=end;

            if closes[i] > opens[i] {
                // Bullish origin: the pullback must reach the origin close
                // but hold above the origin low.
                let retrace_low = confirm.clone().map(|j| lows[j]).fold(f64::MAX, f64::min);
                if retrace_low <= closes[i] && retrace_low > lows[i] {
                    candidates.push(CandidatePattern {
                        kind: PatternKind::OrderBlock,
                        span: (i, end),
                        bias: Direction::Buy,
                        strength: body / atr,
                    });
                }
            } else if closes[i] < opens[i] {
                let retrace_high = confirm.map(|j| highs[j]).fold(f64::MIN, f64::max);
                if retrace_high >= closes[i] && retrace_high < highs[i] {
                    candidates.push(CandidatePattern {
                        kind: PatternKind::OrderBlock,
                        span: (i, end),
                        bias: Direction::Sell,
                        strength: body / atr,
                    });
                }
            }
        }
    }

    /// A liquidity sweep is a brief breach of a prior swing extreme that
    /// closes back inside it within the confirmation window. A breach whose
    /// closes stay beyond the extreme is a breakout, not a sweep.
    fn find_liquidity_sweeps(
        &self,
        highs: &[f64],
        lows: &[f64],
        closes: &[f64],
        swings: &[SwingPoint],
        atr: f64,
        candidates: &mut Vec<CandidatePattern>,
    ) {
        let len = closes.len();

        for swing in swings {
            match swing.kind {
                PatternKind::SwingHigh => {
                    let Some(breach) =
                        (swing.index + 1..len).find(|&b| highs[b] > swing.price)
                    else {
                        continue;
                    };
                    let end = (breach + self.settings.sweep_confirm_bars).min(len);
                    if let Some(j) = (breach..end).find(|&j| closes[j] < swing.price) {
                        let peak = highs[breach..=j].iter().fold(f64::MIN, |a, &b| a.max(b));
                        candidates.push(CandidatePattern {
                            kind: PatternKind::LiquiditySweep,
                            span: (swing.index, j),
                            // Sweeping the high implies a downside reversal.
                            bias: Direction::Sell,
                            strength: (peak - swing.price) / atr,
                        });
                    }
                }
                PatternKind::SwingLow => {
                    let Some(breach) =
                        (swing.index + 1..len).find(|&b| lows[b] < swing.price)
                    else {
                        continue;
                    };
                    let end = (breach + self.settings.sweep_confirm_bars).min(len);
                    if let Some(j) = (breach..end).find(|&j| closes[j] > swing.price) {
                        let trough = lows[breach..=j].iter().fold(f64::MAX, |a, &b| a.min(b));
                        candidates.push(CandidatePattern {
                            kind: PatternKind::LiquiditySweep,
                            span: (swing.index, j),
                            bias: Direction::Buy,
                            strength: (swing.price - trough) / atr,
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

fn neighbor_max(values: &[f64], i: usize, k: usize) -> f64 {
    values[i - k..i]
        .iter()
        .chain(&values[i + 1..=i + k])
        .fold(f64::MIN, |a, &b| a.max(b))
}

fn neighbor_min(values: &[f64], i: usize, k: usize) -> f64 {
    values[i - k..i]
        .iter()
        .chain(&values[i + 1..=i + k])
        .fold(f64::MAX, |a, &b| a.min(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn settings() -> DetectorSettings {
        DetectorSettings {
            swing_strength: 2,
            trailing_window: 120,
            atr_period: 3,
            ob_body_multiplier: 1.5,
            ob_confirm_bars: 4,
            sweep_confirm_bars: 3,
        }
    }

    fn bar(i: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar {
            open_time: i * 60_000,
            open: Decimal::from_f64(o).unwrap(),
            high: Decimal::from_f64(h).unwrap(),
            low: Decimal::from_f64(l).unwrap(),
            close: Decimal::from_f64(c).unwrap(),
            volume: Decimal::from(100),
        }
    }

    /// Rising sequence with one clear swing low, one strong bullish bar and
    /// a higher-low retracement that never breaches the swing low.
    fn bullish_order_block_window() -> Vec<Bar> {
        vec![
            bar(0, 1.0740, 1.0745, 1.0735, 1.0742),
            bar(1, 1.0742, 1.0746, 1.0736, 1.0738),
            bar(2, 1.0738, 1.0742, 1.0730, 1.0734),
            bar(3, 1.0734, 1.0736, 1.0720, 1.0726), // swing low
            bar(4, 1.0726, 1.0734, 1.0724, 1.0731),
            bar(5, 1.0731, 1.0738, 1.0728, 1.0735),
            bar(6, 1.0735, 1.0760, 1.0733, 1.0758), // strong bullish origin
            bar(7, 1.0758, 1.0759, 1.0750, 1.0753), // shallow retracement
            bar(8, 1.0753, 1.0757, 1.0748, 1.0752),
            bar(9, 1.0752, 1.0759, 1.0750, 1.0757),
            bar(10, 1.0757, 1.0764, 1.0754, 1.0762),
            bar(11, 1.0762, 1.0768, 1.0758, 1.0766),
        ]
    }

    #[test]
    fn detects_one_bullish_order_block_on_higher_low_retracement() {
        let detector = PatternDetector::new(settings());
        let candidates = detector.detect(&bullish_order_block_window());

        let obs: Vec<_> = candidates
            .iter()
            .filter(|c| c.kind == PatternKind::OrderBlock)
            .collect();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].bias, Direction::Buy);
        assert_eq!(obs[0].span.0, 6);
        assert!(obs[0].strength > 0.0);
    }

    #[test]
    fn swing_points_need_dominance_on_both_sides() {
        let detector = PatternDetector::new(settings());
        let candidates = detector.detect(&bullish_order_block_window());

        let lows: Vec<_> = candidates
            .iter()
            .filter(|c| c.kind == PatternKind::SwingLow)
            .collect();
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].bias, Direction::Buy);
        // The span covers the comparator window around bar 3.
        assert_eq!(lows[0].span, (1, 5));

        // Bar 11 has the highest high of the window but sits at the edge,
        // with no right-hand neighbors to dominate: not a swing.
        assert!(
            !candidates
                .iter()
                .any(|c| c.kind == PatternKind::SwingHigh && c.span.1 >= 11)
        );
    }

    #[test]
    fn detection_is_idempotent_on_an_unchanged_window() {
        let detector = PatternDetector::new(settings());
        let window = bullish_order_block_window();

        let first = detector.detect(&window);
        let second = detector.detect(&window);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn wick_above_swing_high_that_closes_back_inside_is_a_sweep() {
        let detector = PatternDetector::new(settings());
        let window = vec![
            bar(0, 1.0780, 1.0790, 1.0775, 1.0785),
            bar(1, 1.0785, 1.0795, 1.0780, 1.0790),
            bar(2, 1.0790, 1.0800, 1.0785, 1.0792), // swing high
            bar(3, 1.0792, 1.0796, 1.0782, 1.0786),
            bar(4, 1.0786, 1.0793, 1.0780, 1.0788),
            bar(5, 1.0788, 1.0805, 1.0786, 1.0795), // breach, close back inside
            bar(6, 1.0795, 1.0798, 1.0788, 1.0791),
        ];

        let candidates = detector.detect(&window);
        let sweeps: Vec<_> = candidates
            .iter()
            .filter(|c| c.kind == PatternKind::LiquiditySweep)
            .collect();
        assert_eq!(sweeps.len(), 1);
        assert_eq!(sweeps[0].bias, Direction::Sell);
        assert_eq!(sweeps[0].span, (2, 5));
    }

    #[test]
    fn sustained_breakout_is_not_a_sweep() {
        let detector = PatternDetector::new(settings());
        let window = vec![
            bar(0, 1.0780, 1.0790, 1.0775, 1.0785),
            bar(1, 1.0785, 1.0795, 1.0780, 1.0790),
            bar(2, 1.0790, 1.0800, 1.0785, 1.0792), // swing high
            bar(3, 1.0792, 1.0796, 1.0782, 1.0786),
            bar(4, 1.0786, 1.0793, 1.0780, 1.0788),
            bar(5, 1.0788, 1.0810, 1.0786, 1.0806), // breach and hold above
            bar(6, 1.0806, 1.0815, 1.0802, 1.0812),
        ];

        let candidates = detector.detect(&window);
        assert!(
            !candidates
                .iter()
                .any(|c| c.kind == PatternKind::LiquiditySweep)
        );
    }

    #[test]
    fn short_window_produces_no_candidates() {
        let detector = PatternDetector::new(settings());
        let window = vec![
            bar(0, 1.0780, 1.0790, 1.0775, 1.0785),
            bar(1, 1.0785, 1.0795, 1.0780, 1.0790),
        ];
        assert!(detector.detect(&window).is_empty());
    }
}
