use serde::Serialize;

use crate::analysis::AnalysisResult;

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Captured,
    Analyzing,
    ResultReady,
}

/// Snapshot of the session for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_elapsed_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_size_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<AnalysisResult>,
    pub history_len: usize,
}
