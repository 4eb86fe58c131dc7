use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::audio::EncodedAudio;

/// One persisted analysis, created exactly once per completed verdict and
/// never mutated afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC 3339 instant of creation, unique per entry
    pub id: String,
    /// Human-readable creation time
    pub timestamp: String,
    /// The analyzed audio, persisted so the entry stays playable
    #[serde(rename = "audioUrl")]
    pub audio_url: EncodedAudio,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

impl HistoryEntry {
    pub fn new(result: AnalysisResult, audio_url: EncodedAudio) -> Self {
        Self::with_created_at(result, audio_url, Utc::now())
    }

    pub fn with_created_at(
        result: AnalysisResult,
        audio_url: EncodedAudio,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            timestamp: created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            audio_url,
            result,
        }
    }
}
