// In crates/engine/src/lifecycle.rs

use crate::error::{Error, Result};
use app_config::types::LifecycleSettings;
use chrono::{DateTime, Duration, Utc};
use core_types::{Bar, CandidatePattern, Direction, Outcome, Pair, Signal, TradeResult};
use market_data::BarStore;

/// A candidate pattern together with its classifier verdict.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub pattern: CandidatePattern,
    pub probability: f64,
    pub grade: u8,
}

/// The signal currently being tracked, plus the bar it entered on.
#[derive(Debug, Clone)]
pub struct ActiveSignal {
    pub signal: Signal,
    pub entry_open_time: i64,
}

/// The core state machine: `Idle -> Pending -> {Won, Lost, Void} -> Idle`.
///
/// Owns the active signal exclusively, from creation to terminal state.
/// Holding the signal in an `Option` makes a second simultaneous `Pending`
/// unrepresentable by construction; `publish` still checks, because reaching
/// it with a signal in flight means the caller's sequencing is broken and
/// continuing would corrupt the stats.
#[derive(Debug)]
pub struct LifecycleManager {
    settings: LifecycleSettings,
    pair: Pair,
    bar_interval_ms: i64,
    active: Option<ActiveSignal>,
    next_id: u64,
}

impl LifecycleManager {
    pub fn new(settings: LifecycleSettings, pair: Pair, bar_interval_ms: i64) -> Self {
        if !(1..=10).contains(&settings.min_confidence) {
            panic!("Minimum confidence must be on the 1-10 scale.");
        }
        if settings.max_expiry_bars < 1 || bar_interval_ms <= 0 {
            panic!("Expiry horizon and bar interval must be positive.");
        }
        Self {
            settings,
            pair,
            bar_interval_ms,
            active: None,
            next_id: 1,
        }
    }

    /// Restores the in-flight signal and id counter persisted by a previous
    /// run.
    pub fn restore(&mut self, active: Option<ActiveSignal>, next_id: u64) {
        self.active = active;
        self.next_id = next_id.max(1);
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn active(&self) -> Option<&ActiveSignal> {
        self.active.as_ref()
    }

    pub fn next_signal_id(&self) -> u64 {
        self.next_id
    }

    /// Accepts the best qualifying candidate of this tick and publishes it
    /// as a `Pending` signal entered at the current bar's close.
    ///
    /// Tie-break among qualifying candidates: highest confidence grade, then
    /// larger pattern strength, then earliest span start.
    pub fn publish(
        &mut self,
        mut candidates: Vec<ScoredCandidate>,
        entry_bar: &Bar,
        now: DateTime<Utc>,
    ) -> Result<Option<Signal>> {
        candidates.retain(|c| c.grade >= self.settings.min_confidence);
        if candidates.is_empty() {
            return Ok(None);
        }

        if let Some(active) = &self.active {
            return Err(Error::InvariantViolation {
                reason: format!(
                    "publish attempted while signal #{} is still pending",
                    active.signal.id
                ),
            });
        }

        candidates.sort_by(|a, b| {
            b.grade
                .cmp(&a.grade)
                .then(
                    b.pattern
                        .strength
                        .partial_cmp(&a.pattern.strength)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.pattern.span.0.cmp(&b.pattern.span.0))
        });
        let best = &candidates[0];

        let signal = Signal::new(
            self.next_id,
            self.pair.clone(),
            best.pattern.bias,
            entry_bar.close,
            best.grade,
            self.expiry_for(best.grade),
            now,
        )?;
        self.next_id += 1;

        tracing::info!(
            id = signal.id,
            direction = ?signal.direction,
            confidence = signal.confidence,
            expiry_bars = signal.expiry_bars,
            entry_price = %signal.entry_price,
            discarded = candidates.len() - 1,
            "Signal published."
        );

        self.active = Some(ActiveSignal {
            signal: signal.clone(),
            entry_open_time: entry_bar.open_time,
        });
        Ok(Some(signal))
    }

    /// Checks the in-flight signal against the store once its expiry horizon
    /// is reached, producing the terminal outcome.
    ///
    /// Win vs loss is decided by the close of the bar opening exactly at the
    /// expiry time: movement from entry matching the signal direction is a
    /// win, anything else (including a flat close) a loss. A missing expiry
    /// bar voids the signal instead - a data-integrity guard, not a trading
    /// outcome.
    pub fn evaluate_expiry(&mut self, store: &BarStore, now: DateTime<Utc>) -> Option<Outcome> {
        let active = self.active.as_ref()?;
        let expiry_time =
            active.entry_open_time + active.signal.expiry_bars as i64 * self.bar_interval_ms;

        let latest = store.latest()?;
        if latest.open_time < expiry_time {
            return None;
        }

        let signal = &active.signal;
        let outcome = match store.bar_at(expiry_time) {
            Some(expiry_bar) => {
                let won = match signal.direction {
                    Direction::Buy => expiry_bar.close > signal.entry_price,
                    Direction::Sell => expiry_bar.close < signal.entry_price,
                };
                Outcome {
                    signal_id: signal.id,
                    pair: signal.pair.clone(),
                    direction: signal.direction,
                    entry_price: signal.entry_price,
                    exit_price: Some(expiry_bar.close),
                    result: if won { TradeResult::Win } else { TradeResult::Loss },
                    closed_at: now,
                }
            }
            None => {
                tracing::warn!(
                    id = signal.id,
                    expiry_time,
                    "Expiry bar missing from store; voiding signal."
                );
                Outcome {
                    signal_id: signal.id,
                    pair: signal.pair.clone(),
                    direction: signal.direction,
                    entry_price: signal.entry_price,
                    exit_price: None,
                    result: TradeResult::Void,
                    closed_at: now,
                }
            }
        };

        self.close(&outcome);
        Some(outcome)
    }

    /// Voids a `Pending` signal that has gone stale: the expiry horizon plus
    /// the grace period has elapsed on the wall clock without the data to
    /// finalize it. Runs on every tick, including tickless ones where no bar
    /// arrived.
    pub fn check_staleness(&mut self, now: DateTime<Utc>) -> Option<Outcome> {
        let active = self.active.as_ref()?;
        let signal = &active.signal;
        let allowance = (signal.expiry_bars + self.settings.staleness_grace_bars) as i64
            * self.bar_interval_ms;
        if now - signal.created_at <= Duration::milliseconds(allowance) {
            return None;
        }

        tracing::warn!(
            id = signal.id,
            created_at = %signal.created_at,
            "Pending signal exceeded the staleness threshold; voiding."
        );
        let outcome = Outcome {
            signal_id: signal.id,
            pair: signal.pair.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            exit_price: None,
            result: TradeResult::Void,
            closed_at: now,
        };
        self.close(&outcome);
        Some(outcome)
    }

    /// Terminal state reached: drop ownership of the signal so the very next
    /// tick can accept a new candidate.
    fn close(&mut self, outcome: &Outcome) {
        tracing::info!(id = outcome.signal_id, result = ?outcome.result, "Signal closed.");
        self.active = None;
    }

    /// Expiry horizon for a new signal: the configured base, shortened for
    /// high-confidence entries and stretched for marginal ones, clamped to
    /// the configured bounds.
    fn expiry_for(&self, grade: u8) -> u32 {
        let base = self.settings.base_expiry_bars;
        let adjusted = if grade >= 9 {
            1
        } else if grade >= 7 {
            base.saturating_sub(1)
        } else if grade >= 5 {
            base
        } else {
            base + 1
        };
        adjusted.clamp(1, self.settings.max_expiry_bars)
    }
}
