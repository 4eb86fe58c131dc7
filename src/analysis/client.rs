//! Two-step analysis orchestration
//!
//! Step A (primary verdict) is mandatory and validated at this boundary.
//! Step B (historical trend comparison) runs only when prior results exist
//! and is strictly best-effort: its failures are logged and swallowed, never
//! propagated past this module.

use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::EncodedAudio;

use super::capability::{
    AnalysisCapability, AnalysisError, HistoryComparisonRequest, VoiceAnalysisRequest,
};
use super::types::AnalysisResult;

pub struct AnalysisClient {
    capability: Arc<dyn AnalysisCapability>,
}

impl AnalysisClient {
    pub fn new(capability: Arc<dyn AnalysisCapability>) -> Self {
        Self { capability }
    }

    /// Analyze encoded audio, enriching the verdict with a trend note when
    /// prior results are available
    ///
    /// Prior results are verdicts only; entry ids and audio URIs never reach
    /// the capability.
    pub async fn analyze(
        &self,
        audio: &EncodedAudio,
        prior: &[AnalysisResult],
    ) -> Result<AnalysisResult, AnalysisError> {
        let request = VoiceAnalysisRequest {
            audio_data_uri: audio.as_str().to_string(),
            historical_voice_patterns: None,
        };

        let verdict = self.capability.analyze_voice(request).await?;
        verdict
            .validate()
            .map_err(|e| AnalysisError::Unavailable(format!("invalid verdict: {}", e)))?;

        let comparison_with_history = if prior.is_empty() {
            None
        } else {
            self.compare_with_history(&verdict, prior).await
        };

        info!(
            "Analysis complete: {:?}, {} indicator(s), confidence {}",
            verdict.risk_level,
            verdict.indicators.len(),
            verdict.confidence_score
        );

        Ok(AnalysisResult {
            comparison_with_history,
            ..verdict
        })
    }

    /// Best-effort comparison step; never fails the overall call
    async fn compare_with_history(
        &self,
        current: &AnalysisResult,
        prior: &[AnalysisResult],
    ) -> Option<String> {
        let request = match build_comparison_request(current, prior) {
            Ok(req) => req,
            Err(e) => {
                warn!("Skipping historical comparison: {}", e);
                return None;
            }
        };

        match self.capability.compare_history(request).await {
            Ok(response) => Some(response.trend_analysis),
            Err(e) => {
                warn!("Historical comparison failed, continuing without it: {}", e);
                None
            }
        }
    }
}

fn build_comparison_request(
    current: &AnalysisResult,
    prior: &[AnalysisResult],
) -> Result<HistoryComparisonRequest, serde_json::Error> {
    Ok(HistoryComparisonRequest {
        current_voice_analysis: serde_json::to_string(current)?,
        historical_voice_data: serde_json::to_string(prior)?,
    })
}
