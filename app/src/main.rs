// In app/src/main.rs

use anyhow::Result;
use app_config::Settings;
use clap::{Parser, Subcommand};
use core_types::SystemStatus;
use engine::Engine;
use market_data::CsvFeed;
use scoring::{LogisticModel, Scorer, UnloadedScorer};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A pattern-based trade signal engine.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the signal engine loop against the configured feed.
    Run {
        /// Publish state flagged as DEMO instead of LIVE.
        #[arg(long)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = app_config::load_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.app.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { demo } => run_engine(settings, demo).await,
    }
}

async fn run_engine(settings: Settings, demo: bool) -> Result<()> {
    let status = if demo {
        SystemStatus::Demo
    } else {
        SystemStatus::Live
    };

    let feed = CsvFeed::open(&settings.engine.feed_path)?;

    // The model is an external artifact; running without one is allowed, the
    // engine just treats every tick as "nothing qualifies" until it exists.
    let scorer: Box<dyn Scorer> = match LogisticModel::from_file(&settings.scorer.model_path) {
        Ok(model) => Box::new(model),
        Err(e) => {
            tracing::warn!(error = %e, path = %settings.scorer.model_path, "No usable model artifact.");
            Box::new(UnloadedScorer)
        }
    };

    let (events_tx, mut events_rx) = broadcast::channel(64);

    // Stand-in for the external notification channel: drain the boundary
    // events into the log. A real chat-bot consumer would subscribe the
    // same way.
    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                tracing::info!(target: "notifications", event = %json, "Boundary event.");
            }
        }
    });

    let mut engine = Engine::new(settings, status, Box::new(feed), scorer, None, events_tx)?;
    engine.run().await
}
