use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use voice_vitality::analysis::{AnalysisClient, HttpAnalysisCapability};
use voice_vitality::audio::{CaptureConfig, MicrophoneFactory};
use voice_vitality::history::HistoryStore;
use voice_vitality::session::SessionController;
use voice_vitality::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "voice-vitality")]
#[command(about = "Voice screening service with durable analysis history")]
struct Args {
    /// Config file (without extension, resolved by the config crate)
    #[arg(short, long, default_value = "config/voice-vitality")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!("Analysis capability: {}", cfg.analysis.base_url);
    info!("History storage: {}", cfg.history.storage_dir);

    let capture_config = CaptureConfig {
        target_sample_rate: cfg.audio.sample_rate,
        target_channels: cfg.audio.channels,
        buffer_duration_ms: cfg.audio.buffer_duration_ms,
    };

    let factory = Box::new(MicrophoneFactory::new(capture_config.clone()));
    let capability = Arc::new(HttpAnalysisCapability::new(&cfg.analysis)?);
    let analysis = AnalysisClient::new(capability);
    let store = HistoryStore::new(&cfg.history.storage_dir);

    let controller = Arc::new(SessionController::new(
        factory,
        analysis,
        store,
        capture_config,
    ));

    let router = create_router(AppState::new(controller));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
