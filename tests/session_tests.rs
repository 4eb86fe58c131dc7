// Integration tests for the session state machine
//
// Capture hardware and the remote capability are replaced with scripted
// implementations; history persists to a per-test temp directory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};
use voice_vitality::analysis::{
    AnalysisCapability, AnalysisClient, AnalysisError, AnalysisResult, ConfidenceLevel,
    HistoryComparisonRequest, HistoryComparisonResponse, Indicator, RiskLevel,
    VoiceAnalysisRequest,
};
use voice_vitality::audio::{
    AudioFrame, AudioPayload, CaptureBackend, CaptureConfig, CaptureError, CaptureFactory,
    EncodedAudio,
};
use voice_vitality::history::{HistoryEntry, HistoryLog, HistoryStore};
use voice_vitality::session::{SessionController, SessionError, SessionState};

// ============================================================================
// Scripted capture
// ============================================================================

struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    tx: Option<mpsc::Sender<AudioFrame>>,
    capturing: bool,
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let (tx, rx) = mpsc::channel(64);
        for frame in self.frames.drain(..) {
            let _ = tx.try_send(frame);
        }
        self.tx = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        // Dropping the sender closes the frame channel
        self.tx = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedFactory;

impl CaptureFactory for ScriptedFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        Ok(Box::new(ScriptedBackend {
            frames: vec![AudioFrame {
                samples: vec![0, 500, -500, 250],
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: 0,
            }],
            tx: None,
            capturing: false,
        }))
    }
}

struct DeniedFactory;

impl CaptureFactory for DeniedFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        Err(CaptureError::DeviceAccess(
            "scripted permission denial".to_string(),
        ))
    }
}

// ============================================================================
// Scripted capability
// ============================================================================

struct ScriptedCapability {
    fail_primary: AtomicBool,
    /// Zero-permit gate; `analyze_voice` blocks until a permit is added
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedCapability {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_primary: AtomicBool::new(false),
            gate: None,
        })
    }

    fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            fail_primary: AtomicBool::new(false),
            gate: Some(gate),
        })
    }
}

fn verdict() -> AnalysisResult {
    AnalysisResult {
        indicators: vec![Indicator::VocalTremor],
        risk_level: RiskLevel::Few,
        summary: "One clear indicator.".to_string(),
        confidence_score: 50,
        confidence_level: ConfidenceLevel::Medium,
        comparison_with_history: None,
    }
}

#[async_trait::async_trait]
impl AnalysisCapability for ScriptedCapability {
    async fn analyze_voice(
        &self,
        _request: VoiceAnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        if self.fail_primary.load(Ordering::SeqCst) {
            return Err(AnalysisError::Unavailable("scripted outage".to_string()));
        }
        Ok(verdict())
    }

    async fn compare_history(
        &self,
        _request: HistoryComparisonRequest,
    ) -> Result<HistoryComparisonResponse, AnalysisError> {
        Ok(HistoryComparisonResponse {
            trend_analysis: "Stable.".to_string(),
            recommendations: "None.".to_string(),
        })
    }
}

fn controller(
    factory: impl CaptureFactory + 'static,
    capability: Arc<dyn AnalysisCapability>,
    dir: &TempDir,
) -> SessionController {
    SessionController::new(
        Box::new(factory),
        AnalysisClient::new(capability),
        HistoryStore::new(dir.path()),
        CaptureConfig::default(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_record_stop_analyze_happy_path() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    assert_eq!(session.status().await.state, SessionState::Idle);

    session.start_recording().await.unwrap();
    assert_eq!(session.status().await.state, SessionState::Recording);

    session.stop_recording().await.unwrap();
    let status = session.status().await;
    assert_eq!(status.state, SessionState::Captured);
    assert_eq!(status.captured_mime_type.as_deref(), Some("audio/wav"));

    let outcome = session.analyze().await.unwrap();
    assert_eq!(outcome.result.risk_level, RiskLevel::Few);
    assert!(outcome.persist_warning.is_none());
    // Empty history at analysis time, so no comparison
    assert!(outcome.result.comparison_with_history.is_none());

    let status = session.status().await;
    assert_eq!(status.state, SessionState::ResultReady);
    assert_eq!(status.history_len, 1);

    // Entry carries the analyzed audio
    let history = session.history().await;
    let decoded = history[0].audio_url.decode().unwrap();
    assert_eq!(decoded.mime_type, "audio/wav");
}

#[tokio::test]
async fn test_stop_without_recording_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    assert!(matches!(
        session.stop_recording().await.unwrap_err(),
        SessionError::NotRecording
    ));
    assert_eq!(session.status().await.state, SessionState::Idle);
}

#[tokio::test]
async fn test_start_while_recording_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    session.start_recording().await.unwrap();

    assert!(matches!(
        session.start_recording().await.unwrap_err(),
        SessionError::AlreadyRecording
    ));
    assert_eq!(session.status().await.state, SessionState::Recording);
}

#[tokio::test]
async fn test_device_denial_leaves_session_idle() {
    let dir = TempDir::new().unwrap();
    let session = controller(DeniedFactory, ScriptedCapability::ok(), &dir);

    let err = session.start_recording().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Capture(CaptureError::DeviceAccess(_))
    ));
    assert_eq!(session.status().await.state, SessionState::Idle);
}

#[tokio::test]
async fn test_select_file_rejects_non_audio_without_state_change() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    let err = session
        .select_file("application/pdf", vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Capture(CaptureError::InvalidFileType(_))
    ));
    assert_eq!(session.status().await.state, SessionState::Idle);
    assert!(session.captured_audio().await.is_none());
}

#[tokio::test]
async fn test_select_file_while_recording_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    session.start_recording().await.unwrap();

    assert!(matches!(
        session.select_file("audio/mpeg", vec![1]).await.unwrap_err(),
        SessionError::AlreadyRecording
    ));
}

#[tokio::test]
async fn test_analyze_without_capture_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    assert!(matches!(
        session.analyze().await.unwrap_err(),
        SessionError::NoCapturedAudio
    ));
}

#[tokio::test]
async fn test_analysis_failure_preserves_capture_for_retry() {
    let dir = TempDir::new().unwrap();
    let capability = ScriptedCapability::ok();
    capability.fail_primary.store(true, Ordering::SeqCst);
    let session = controller(ScriptedFactory, capability.clone(), &dir);

    session.select_file("audio/mpeg", vec![9, 9, 9]).await.unwrap();

    let err = session.analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Analysis(_)));

    // Back to captured with the original payload, history untouched
    let status = session.status().await;
    assert_eq!(status.state, SessionState::Captured);
    assert_eq!(status.history_len, 0);
    assert_eq!(
        session.captured_audio().await.unwrap(),
        AudioPayload::new(vec![9, 9, 9], "audio/mpeg")
    );

    // Retry succeeds once the capability recovers
    capability.fail_primary.store(false, Ordering::SeqCst);
    session.analyze().await.unwrap();
    assert_eq!(session.status().await.history_len, 1);
}

#[tokio::test]
async fn test_reset_is_idempotent_from_every_state() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    // From idle
    session.reset().await;
    session.reset().await;
    assert_eq!(session.status().await.state, SessionState::Idle);

    // From recording
    session.start_recording().await.unwrap();
    session.reset().await;
    session.reset().await;
    assert_eq!(session.status().await.state, SessionState::Idle);
    assert!(session.captured_audio().await.is_none());

    // From result_ready, leaving history intact
    session.select_file("audio/wav", vec![1]).await.unwrap();
    session.analyze().await.unwrap();
    session.reset().await;
    session.reset().await;
    let status = session.status().await;
    assert_eq!(status.state, SessionState::Idle);
    assert_eq!(status.history_len, 1);
    assert!(session.captured_audio().await.is_none());
}

#[tokio::test]
async fn test_new_capture_discards_previous_payload() {
    let dir = TempDir::new().unwrap();
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);

    session.select_file("audio/mpeg", vec![1]).await.unwrap();
    session.select_file("audio/ogg", vec![2]).await.unwrap();

    assert_eq!(
        session.captured_audio().await.unwrap(),
        AudioPayload::new(vec![2], "audio/ogg")
    );
}

#[tokio::test]
async fn test_full_log_evicts_oldest_through_controller() {
    let dir = TempDir::new().unwrap();

    // Seed the durable slot with a full log
    let store = HistoryStore::new(dir.path());
    let mut log = HistoryLog::new();
    for n in 0..10i64 {
        let created_at = chrono::Utc::now() - chrono::Duration::minutes(100 - n);
        log = log.append(HistoryEntry::with_created_at(
            verdict(),
            EncodedAudio::encode(&AudioPayload::new(vec![n as u8], "audio/wav")),
            created_at,
        ));
    }
    store.save(&log).unwrap();
    let oldest_id = log.entries().last().unwrap().id.clone();

    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);
    assert_eq!(session.status().await.history_len, 10);

    session.select_file("audio/wav", vec![42]).await.unwrap();
    let outcome = session.analyze().await.unwrap();
    // Ten prior results were available, so the comparison step ran
    assert_eq!(outcome.result.comparison_with_history.as_deref(), Some("Stable."));

    let history = session.history().await;
    assert_eq!(history.len(), 10);
    assert!(history.iter().all(|e| e.id != oldest_id));
    assert_eq!(
        history[0].audio_url.decode().unwrap().bytes,
        vec![42]
    );
}

#[tokio::test]
async fn test_reentrant_analyze_rejected_and_reset_abandons_verdict() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let session = Arc::new(controller(
        ScriptedFactory,
        ScriptedCapability::gated(gate.clone()),
        &dir,
    ));

    session.select_file("audio/wav", vec![7]).await.unwrap();

    let in_flight = {
        let session = session.clone();
        tokio::spawn(async move { session.analyze().await })
    };

    // Wait until the first call holds the analyzing state
    while session.status().await.state != SessionState::Analyzing {
        tokio::task::yield_now().await;
    }

    // Re-entrant analyze is rejected
    assert!(matches!(
        session.analyze().await.unwrap_err(),
        SessionError::AnalysisInFlight
    ));

    // Reset abandons the in-flight request
    session.reset().await;
    assert_eq!(session.status().await.state, SessionState::Idle);

    // Release the capability; the late verdict must be discarded
    gate.add_permits(1);
    let result = in_flight.await.unwrap();
    assert!(matches!(result.unwrap_err(), SessionError::Superseded));

    assert_eq!(session.status().await.history_len, 0);
    assert_eq!(session.status().await.state, SessionState::Idle);
}

#[tokio::test]
async fn test_persistence_failure_is_nonfatal_warning() {
    let dir = TempDir::new().unwrap();
    // Block the storage directory with a plain file
    let blocker = dir.path().join("slot-dir");
    std::fs::write(&blocker, "x").unwrap();

    let session = SessionController::new(
        Box::new(ScriptedFactory),
        AnalysisClient::new(ScriptedCapability::ok()),
        HistoryStore::new(&blocker),
        CaptureConfig::default(),
    );

    session.select_file("audio/wav", vec![1]).await.unwrap();
    let outcome = session.analyze().await.unwrap();

    // Analysis succeeded; the save failure is only a warning
    assert!(outcome.persist_warning.is_some());
    assert_eq!(session.status().await.state, SessionState::ResultReady);
    assert_eq!(session.status().await.history_len, 1);
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);
        session.select_file("audio/wav", vec![3]).await.unwrap();
        session.analyze().await.unwrap();
    }

    // New controller over the same slot
    let session = controller(ScriptedFactory, ScriptedCapability::ok(), &dir);
    let history = session.history().await;

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].audio_url.decode().unwrap().bytes, vec![3]);
}
