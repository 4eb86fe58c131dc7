//! HTTP API server for the presentation layer
//!
//! This module exposes the session controller's command/query surface:
//! - POST /session/record/start - Begin microphone capture
//! - POST /session/record/stop - Finalize the clip
//! - POST /session/upload - Ingest an audio file as a data URI
//! - POST /session/analyze - Run the analysis pipeline
//! - POST /session/reset - Return to idle
//! - GET /session/status - Session snapshot
//! - GET /session/audio - Captured bytes for playback
//! - GET /history - Past analyses, newest first
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
