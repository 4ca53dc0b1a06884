// In crates/app-config/src/types.rs

use serde::Deserialize;

use patterns::types::DetectorSettings;
use scoring::types::ScorerSettings;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Settings for the tick-driven engine.
    pub engine: EngineSettings,
    /// Settings for the rolling bar store.
    pub bar_store: BarStoreSettings,
    /// Settings for the pattern detector.
    pub detector: DetectorSettings,
    /// Settings for the confidence scorer.
    pub scorer: ScorerSettings,
    /// Settings for the signal lifecycle.
    pub lifecycle: LifecycleSettings,
    /// Settings for the published state files.
    pub publisher: PublisherSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EngineSettings {
    /// The instrument pair this engine instance trades (e.g., "EURUSD").
    pub pair: String,
    /// The bar interval in seconds. Also the scheduler tick period: one
    /// tick per candle close.
    pub bar_interval_secs: u64,
    /// Path to the CSV file the replay feed reads bars from.
    pub feed_path: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BarStoreSettings {
    /// Number of most-recent bars the store retains before eviction.
    #[serde(default = "default_retention_bars")]
    pub retention_bars: usize,
}

/// Expiry and staleness settings for the signal lifecycle.
#[derive(Deserialize, Debug, Clone)]
pub struct LifecycleSettings {
    /// Minimum confidence grade (1-10) a candidate needs to be published.
    pub min_confidence: u8,
    /// Base expiry horizon in bars before confidence/volatility adjustment.
    #[serde(default = "default_base_expiry")]
    pub base_expiry_bars: u32,
    /// Hard upper bound on the expiry horizon.
    #[serde(default = "default_max_expiry")]
    pub max_expiry_bars: u32,
    /// Extra bar intervals of wall-clock silence after expiry before a
    /// stale `Pending` signal is voided.
    #[serde(default = "default_staleness_grace")]
    pub staleness_grace_bars: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PublisherSettings {
    /// Directory the published JSON state files are written into.
    pub output_dir: String,
    /// Bounded number of attempts for a single state-file write.
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
}

/// Helper functions for serde defaults
fn default_retention_bars() -> usize { 500 }
fn default_base_expiry() -> u32 { 2 }
fn default_max_expiry() -> u32 { 3 }
fn default_staleness_grace() -> u32 { 2 }
fn default_write_attempts() -> u32 { 3 }
