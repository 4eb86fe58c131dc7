// Example: Analyze an audio file against the remote capability
//
// This example demonstrates the complete analysis pipeline without a
// microphone:
// 1. Read an audio file from disk
// 2. Encode it as a data URI
// 3. Run the two-step analysis (with prior history as context)
// 4. Append the verdict to the durable history slot
//
// Usage: cargo run --example analyze_file -- --file sample.wav

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use voice_vitality::analysis::{AnalysisClient, HttpAnalysisCapability};
use voice_vitality::audio::{AudioPayload, EncodedAudio};
use voice_vitality::config::AnalysisConfig;
use voice_vitality::history::{HistoryEntry, HistoryStore};

#[derive(Parser)]
#[command(name = "analyze_file")]
#[command(about = "Analyze an audio file for acoustic indicators")]
struct Args {
    /// Audio file to analyze
    #[arg(short, long)]
    file: String,

    /// Declared MIME type (guessed from the extension when omitted)
    #[arg(short, long)]
    mime: Option<String>,

    /// Base URL of the analysis capability
    #[arg(short, long, default_value = "http://localhost:4851")]
    base_url: String,

    /// History storage directory
    #[arg(short, long, default_value = "~/.voice-vitality")]
    storage_dir: String,
}

fn guess_mime(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" => "audio/mp4",
        _ => "audio/wav",
    }
    .to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let mime = args.mime.unwrap_or_else(|| guess_mime(&args.file));
    let bytes = std::fs::read(&args.file)?;
    let payload = AudioPayload::from_file(&mime, bytes)?;
    info!("Loaded {}: {} bytes of {}", args.file, payload.size_bytes(), mime);

    let storage_dir = shellexpand::tilde(&args.storage_dir).to_string();
    let store = HistoryStore::new(&storage_dir);
    let log = store.load();
    info!("{} prior analyse(s) on record", log.len());

    let capability = Arc::new(HttpAnalysisCapability::new(&AnalysisConfig {
        base_url: args.base_url,
        api_key: std::env::var("VOICE_VITALITY_API_KEY").ok(),
        timeout_secs: 60,
    })?);
    let client = AnalysisClient::new(capability);

    let encoded = EncodedAudio::encode(&payload);
    let result = client.analyze(&encoded, &log.results()).await?;

    println!("Risk level:  {:?}", result.risk_level);
    println!("Indicators:  {:?}", result.indicators);
    println!(
        "Confidence:  {} ({:?})",
        result.confidence_score, result.confidence_level
    );
    println!("Summary:     {}", result.summary);
    if let Some(trend) = &result.comparison_with_history {
        println!("Trend:       {}", trend);
    }

    let log = log.append(HistoryEntry::new(result, encoded));
    store.save(&log)?;
    info!("History saved ({} entrie(s))", log.len());

    Ok(())
}
