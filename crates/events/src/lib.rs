// --- Boundary event records emitted at lifecycle transitions ---

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Outcome, Signal, SystemSnapshot};
use serde::Serialize;
use tokio::sync::broadcast;

/// Emitted when a candidate is accepted and a signal goes `Pending`.
#[derive(Debug, Clone, Serialize)]
pub struct SignalPublished {
    pub at: DateTime<Utc>,
    pub signal: Signal,
}

/// Emitted when a signal reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct SignalClosed {
    pub at: DateTime<Utc>,
    pub outcome: Outcome,
    pub snapshot: SystemSnapshot,
}

/// The top-level engine event enum.
/// `tag` and `content` are used by serde for clean JSON representation.
///
/// Events are immutable value records: whatever an external channel does
/// with one (or fails to do), the engine neither knows nor cares.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    SignalPublished(SignalPublished),
    SignalClosed(SignalClosed),
}

/// The fan-out side of the notification boundary.
pub type EventSender = broadcast::Sender<EngineEvent>;

/// The optional narrative-generation boundary. A terminal outcome may be
/// handed to an implementation for commentary; any failure is logged by the
/// caller and must never touch engine state.
#[async_trait]
pub trait Commentator: Send {
    /// The name of the commentary backend.
    fn name(&self) -> &'static str;

    async fn narrate(&self, outcome: &Outcome) -> anyhow::Result<String>;
}
