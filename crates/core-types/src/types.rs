// In crates/core-types/src/types.rs

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single OHLCV price observation for a fixed time interval.
///
/// Bars are immutable once appended to the store. Corrections to historical
/// data must be modeled as new bars, never as in-place edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time of the interval, in epoch milliseconds. Strictly increasing
    /// across a bar sequence.
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Validates the internal consistency of a bar received from a feed.
    pub fn validate(&self) -> Result<()> {
        if self.high < self.low {
            return Err(Error::InvalidBar(format!(
                "high {} below low {}",
                self.high, self.low
            )));
        }
        if self.open > self.high || self.open < self.low {
            return Err(Error::InvalidBar(format!(
                "open {} outside [{}, {}]",
                self.open, self.low, self.high
            )));
        }
        if self.close > self.high || self.close < self.low {
            return Err(Error::InvalidBar(format!(
                "close {} outside [{}, {}]",
                self.close, self.low, self.high
            )));
        }
        Ok(())
    }
}

/// An instrument pair identifier (e.g., "EURUSD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair(pub String);

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The direction of a trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

/// The kind of structural pattern a detection pass can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    SwingHigh,
    SwingLow,
    OrderBlock,
    LiquiditySweep,
}

/// A structural pattern found in the current detection window.
///
/// Candidates are ephemeral: produced and consumed within one detection pass,
/// never persisted. `span` indexes into the window slice the detector was
/// given, not into the full bar history.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePattern {
    pub kind: PatternKind,
    /// Inclusive (start, end) index range of the bars the pattern spans.
    pub span: (usize, usize),
    pub bias: Direction,
    /// Breakout/retracement magnitude relative to local volatility.
    pub strength: f64,
}

/// Lifecycle state of a published signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalState {
    Pending,
    Won,
    Lost,
    Void,
}

impl SignalState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SignalState::Pending)
    }
}

/// A published trade signal, owned by the lifecycle manager from creation to
/// its terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: u64,
    pub pair: Pair,
    pub direction: Direction,
    pub entry_price: Decimal,
    /// Confidence grade on the 1-10 integer scale.
    pub confidence: u8,
    /// Expiry horizon as a count of bars after the entry bar.
    pub expiry_bars: u32,
    pub created_at: DateTime<Utc>,
    pub state: SignalState,
}

impl Signal {
    /// Creates a new `Pending` signal, validating the confidence grade.
    pub fn new(
        id: u64,
        pair: Pair,
        direction: Direction,
        entry_price: Decimal,
        confidence: u8,
        expiry_bars: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !(1..=10).contains(&confidence) {
            return Err(Error::InvalidConfidence(confidence));
        }
        Ok(Self {
            id,
            pair,
            direction,
            entry_price,
            confidence,
            expiry_bars,
            created_at,
            state: SignalState::Pending,
        })
    }
}

/// The result of a finalized signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Loss,
    /// Data-integrity guard, not a trading outcome. Excluded from the
    /// win-rate denominator.
    Void,
}

/// The record created exactly once when a signal reaches a terminal state.
///
/// Holds a back-reference to the signal, not ownership of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub signal_id: u64,
    pub pair: Pair,
    pub direction: Direction,
    pub entry_price: Decimal,
    /// `None` when the signal was voided without a usable expiry bar.
    pub exit_price: Option<Decimal>,
    pub result: TradeResult,
    pub closed_at: DateTime<Utc>,
}

/// The operating mode reported in the published system status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemStatus {
    Live,
    Demo,
    Idle,
}

/// Aggregate counters for the whole system.
///
/// Mutated only by the outcome recorder and by signal creation/termination;
/// every other consumer receives a value copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub total_trades: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    /// Win rate as a percentage, always recomputed from the counters.
    pub win_rate: f64,
    pub status: SystemStatus,
    pub active_signals: u32,
    pub degraded: bool,
}

impl SystemSnapshot {
    pub fn new(status: SystemStatus) -> Self {
        Self {
            total_trades: 0,
            total_wins: 0,
            total_losses: 0,
            win_rate: 0.0,
            status,
            active_signals: 0,
            degraded: false,
        }
    }

    /// Recomputes `win_rate` from the counters. Called after every counter
    /// update so the rate can never drift from the totals it summarizes.
    pub fn recompute_win_rate(&mut self) {
        self.win_rate = if self.total_trades > 0 {
            (self.total_wins as f64 / self.total_trades as f64) * 100.0
        } else {
            0.0
        };
    }
}
