// In crates/publisher/src/lib.rs

pub mod error;
pub mod files;
pub mod state;

// Re-export public types
pub use error::{Error, Result};
pub use files::{LastResultFile, LastSignalFile, StatePublisher, SystemStatusFile};
pub use state::ResumeState;
