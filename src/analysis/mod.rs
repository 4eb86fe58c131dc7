pub mod capability;
pub mod client;
pub mod types;

pub use capability::{
    AnalysisCapability, AnalysisError, HistoryComparisonRequest, HistoryComparisonResponse,
    HttpAnalysisCapability, VoiceAnalysisRequest,
};
pub use client::AnalysisClient;
pub use types::{AnalysisResult, ConfidenceLevel, Indicator, RiskLevel, VerdictError};
