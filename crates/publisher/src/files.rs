// In crates/publisher/src/files.rs

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use core_types::{Direction, Outcome, Pair, Signal, SystemSnapshot, SystemStatus, TradeResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The published `system_status.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatusFile {
    pub win_rate: f64,
    pub active_signals: u32,
    pub status: SystemStatus,
    pub total_trades: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub degraded: bool,
    pub last_updated: DateTime<Utc>,
}

/// The published `last_signal.json` document. The absence of an active
/// signal is an explicit marker object, never a missing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastSignalFile {
    Present {
        pair: Pair,
        direction: Direction,
        confidence: u8,
        entry_price: Decimal,
        expiry: u32,
        last_updated: DateTime<Utc>,
    },
    Empty {
        error: String,
        last_updated: DateTime<Utc>,
    },
}

/// The published `last_result.json` document, with the same explicit-empty
/// convention as `LastSignalFile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastResultFile {
    Present {
        pair: Pair,
        direction: Direction,
        result: TradeResult,
        entry_price: Decimal,
        exit_price: Option<Decimal>,
        last_updated: DateTime<Utc>,
    },
    Empty {
        error: String,
        last_updated: DateTime<Utc>,
    },
}

/// Mirrors engine state into the static JSON documents that form the
/// external read contract, plus an append-only trade log.
///
/// Every write goes through the same path: serialize, write to a `.tmp`
/// sibling, re-read and parse it, then rename over the target. A reader can
/// therefore never observe a torn file. Writes are retried a bounded number
/// of times before being surfaced as a `PersistenceFault`.
#[derive(Debug)]
pub struct StatePublisher {
    output_dir: PathBuf,
    attempts: u32,
}

impl StatePublisher {
    pub fn new(output_dir: impl Into<PathBuf>, attempts: u32) -> Result<Self> {
        assert!(attempts > 0, "Write attempts must be greater than 0.");
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir, attempts })
    }

    pub fn publish_status(&self, snapshot: &SystemSnapshot, now: DateTime<Utc>) -> Result<()> {
        let doc = SystemStatusFile {
            win_rate: snapshot.win_rate,
            active_signals: snapshot.active_signals,
            status: snapshot.status,
            total_trades: snapshot.total_trades,
            total_wins: snapshot.total_wins,
            total_losses: snapshot.total_losses,
            degraded: snapshot.degraded,
            last_updated: now,
        };
        self.write_atomic("system_status.json", &doc)
    }

    pub fn publish_signal(&self, signal: Option<&Signal>, now: DateTime<Utc>) -> Result<()> {
        let doc = match signal {
            Some(s) => LastSignalFile::Present {
                pair: s.pair.clone(),
                direction: s.direction,
                confidence: s.confidence,
                entry_price: s.entry_price,
                expiry: s.expiry_bars,
                last_updated: now,
            },
            None => LastSignalFile::Empty {
                error: "no active signal".to_string(),
                last_updated: now,
            },
        };
        self.write_atomic("last_signal.json", &doc)
    }

    pub fn publish_result(&self, outcome: Option<&Outcome>, now: DateTime<Utc>) -> Result<()> {
        let doc = match outcome {
            Some(o) => LastResultFile::Present {
                pair: o.pair.clone(),
                direction: o.direction,
                result: o.result,
                entry_price: o.entry_price,
                exit_price: o.exit_price,
                last_updated: now,
            },
            None => LastResultFile::Empty {
                error: "no recent result".to_string(),
                last_updated: now,
            },
        };
        self.write_atomic("last_result.json", &doc)
    }

    /// Appends one closed trade to `trade_log.jsonl`.
    pub fn append_trade_log(&self, outcome: &Outcome) -> Result<()> {
        let line = serde_json::to_string(outcome)?;
        self.with_retries("trade_log.jsonl", || {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.output_dir.join("trade_log.jsonl"))?;
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            Ok(())
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub(crate) fn write_atomic<T: Serialize>(&self, name: &str, doc: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.output_dir.join(format!("{name}.tmp"));
        let final_path = self.output_dir.join(name);

        self.with_retries(name, || {
            std::fs::write(&tmp_path, &json)?;
            // Re-read and parse before the rename so a torn tmp write can
            // never be promoted to the published file.
            let written = std::fs::read_to_string(&tmp_path)?;
            serde_json::from_str::<serde_json::Value>(&written)?;
            std::fs::rename(&tmp_path, &final_path)?;
            Ok(())
        })
    }

    fn with_retries(&self, name: &str, mut attempt: impl FnMut() -> Result<()>) -> Result<()> {
        for n in 1..=self.attempts {
            match attempt() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(file = name, attempt = n, error = %e, "State write failed.");
                }
            }
        }
        Err(Error::PersistenceFault {
            file: name.to_string(),
            attempts: self.attempts,
        })
    }
}
