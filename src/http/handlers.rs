use super::state::AppState;
use crate::analysis::AnalysisResult;
use crate::audio::{CaptureError, EncodedAudio};
use crate::session::{SessionError, SessionState};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: SessionState,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Optional original file name, logged only
    pub file_name: Option<String>,

    /// `data:<mimetype>;base64,<data>` audio
    pub audio_data_uri: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: AnalysisResult,

    /// Present when the verdict could not be persisted durably
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_error_response(e: SessionError) -> Response {
    let status = match &e {
        SessionError::AlreadyRecording
        | SessionError::NotRecording
        | SessionError::NoCapturedAudio
        | SessionError::AnalysisInFlight
        | SessionError::Superseded => StatusCode::CONFLICT,
        SessionError::Capture(CaptureError::InvalidFileType(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        SessionError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Analysis(_) => StatusCode::BAD_GATEWAY,
    };

    error!("Request failed: {}", e);
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/record/start
pub async fn start_recording(State(state): State<AppState>) -> Response {
    match state.controller.start_recording().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StateResponse {
                state: SessionState::Recording,
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /session/record/stop
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    match state.controller.stop_recording().await {
        Ok(()) => {
            let status = state.controller.status().await;
            (StatusCode::OK, Json(status)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// POST /session/upload
pub async fn upload(State(state): State<AppState>, Json(req): Json<UploadRequest>) -> Response {
    if let Some(name) = &req.file_name {
        info!("Upload received: {}", name);
    }

    let encoded = match EncodedAudio::parse(req.audio_data_uri) {
        Ok(encoded) => encoded,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    let payload = match encoded.decode() {
        Ok(payload) => payload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    let mime_type = payload.mime_type.clone();
    match state.controller.select_file(&mime_type, payload.bytes).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StateResponse {
                state: SessionState::Captured,
                message: "Audio accepted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /session/analyze
pub async fn analyze(State(state): State<AppState>) -> Response {
    match state.controller.analyze().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                result: outcome.result,
                warning: outcome.persist_warning,
            }),
        )
            .into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /session/reset
pub async fn reset(State(state): State<AppState>) -> Response {
    state.controller.reset().await;
    (
        StatusCode::OK,
        Json(StateResponse {
            state: SessionState::Idle,
            message: "Session reset".to_string(),
        }),
    )
        .into_response()
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> Response {
    let status = state.controller.status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// GET /session/audio
/// Raw captured bytes for playback preview
pub async fn get_audio(State(state): State<AppState>) -> Response {
    match state.controller.captured_audio().await {
        Some(payload) => (
            [(header::CONTENT_TYPE, payload.mime_type.clone())],
            payload.bytes,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No captured audio".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /history
/// Past analyses, newest first
pub async fn get_history(State(state): State<AppState>) -> Response {
    let entries = state.controller.history().await;
    (StatusCode::OK, Json(entries)).into_response()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
