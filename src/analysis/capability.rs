//! Remote analysis capability
//!
//! The AI analysis is an opaque HTTP service: audio in, structured verdict
//! out. The trait keeps the session controller testable with scripted
//! capabilities; `HttpAnalysisCapability` is the production implementation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::AnalysisConfig;

use super::types::AnalysisResult;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Voice analysis is unavailable: {0}")]
    Unavailable(String),
}

/// Request for the primary analysis step
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalysisRequest {
    /// `data:<mimetype>;base64,<data>` audio
    pub audio_data_uri: String,
    /// Optional serialized record of prior verdicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_voice_patterns: Option<String>,
}

/// Request for the best-effort historical comparison step
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryComparisonRequest {
    /// Current verdict as JSON
    pub current_voice_analysis: String,
    /// Prior verdicts as a JSON array
    pub historical_voice_data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryComparisonResponse {
    pub trend_analysis: String,
    pub recommendations: String,
}

#[async_trait::async_trait]
pub trait AnalysisCapability: Send + Sync {
    /// Primary analysis: audio in, verdict out (without history comparison)
    async fn analyze_voice(
        &self,
        request: VoiceAnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError>;

    /// Secondary trend analysis against prior verdicts
    async fn compare_history(
        &self,
        request: HistoryComparisonRequest,
    ) -> Result<HistoryComparisonResponse, AnalysisError>;
}

/// HTTP client for the remote analysis service
pub struct HttpAnalysisCapability {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAnalysisCapability {
    pub fn new(config: &AnalysisConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        info!("Analysis capability at {}", config.base_url);

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AnalysisError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        // Single attempt per step per call, no retries
        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::Unavailable(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Unavailable(format!(
                "{} returned {}: {}",
                url, status, detail
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AnalysisError::Unavailable(format!("malformed response from {}: {}", url, e)))
    }
}

#[async_trait::async_trait]
impl AnalysisCapability for HttpAnalysisCapability {
    async fn analyze_voice(
        &self,
        request: VoiceAnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.post_json("/voice/analyze", &request).await
    }

    async fn compare_history(
        &self,
        request: HistoryComparisonRequest,
    ) -> Result<HistoryComparisonResponse, AnalysisError> {
        self.post_json("/voice/compare", &request).await
    }
}
