pub mod analysis;
pub mod audio;
pub mod config;
pub mod history;
pub mod http;
pub mod session;

pub use analysis::{
    AnalysisCapability, AnalysisClient, AnalysisError, AnalysisResult, ConfidenceLevel,
    HttpAnalysisCapability, Indicator, RiskLevel,
};
pub use audio::{
    AudioPayload, CaptureBackend, CaptureConfig, CaptureError, CaptureFactory, ClipRecorder,
    EncodedAudio, MicrophoneFactory,
};
pub use config::Config;
pub use history::{HistoryEntry, HistoryLog, HistoryStore, PersistenceError, HISTORY_CAPACITY};
pub use http::{create_router, AppState};
pub use session::{AnalyzeOutcome, SessionController, SessionError, SessionState, SessionStatus};
