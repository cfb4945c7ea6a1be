mod app;
mod audio;
mod commands;
mod config;
mod error;
mod journal;
mod messages;
mod services;
mod storage;

use app::App;
use audio::{AudioCapture, AudioFormat, AudioPlayback};
use config::Config;
use storage::JournalDb;

use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting echo journal");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // LocalSet for !Send futures (the cpal and rodio streams live inside the services)
    let local = tokio::task::LocalSet::new();

    local.run_until(async move { run_app(config).await }).await
}

async fn run_app(config: Config) -> Result<()> {
    let db = JournalDb::open(config.database_path())
        .with_context(|| format!("Failed to open journal at {:?}", config.database_path()))?;

    let capture = AudioCapture::new(config.capture_chunk_secs(), config.ring_secs());
    let recorder = services::recorder::spawn(AudioFormat::default(), capture);
    let player = services::player::spawn(AudioPlayback::new(), config.progress_interval());

    App::new(config, db, recorder, player)?.run().await
}
