// In crates/publisher/src/state.rs

use crate::{Result, StatePublisher};
use core_types::{Signal, SystemSnapshot};
use serde::{Deserialize, Serialize};

/// The minimal state needed to resume lifecycle tracking across restarts:
/// the in-flight signal (if any), the bar it entered on, the aggregate
/// counters, and the id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub active_signal: Option<Signal>,
    /// Open time of the bar the active signal entered on, epoch millis.
    pub entry_open_time: Option<i64>,
    pub snapshot: SystemSnapshot,
    pub next_signal_id: u64,
}

impl StatePublisher {
    /// Persists the resume state through the same atomic write path as the
    /// published documents.
    pub fn save_resume_state(&self, state: &ResumeState) -> Result<()> {
        self.write_atomic("state.json", state)
    }

    /// Loads the resume state if a previous run left one behind.
    pub fn load_resume_state(&self) -> Result<Option<ResumeState>> {
        let path = self.output_dir().join("state.json");
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        let state: ResumeState = serde_json::from_str(&raw)?;
        Ok(Some(state))
    }
}
