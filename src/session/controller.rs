//! Session state machine
//!
//! Orchestrates capture, encoding, analysis, and history persistence behind
//! a command/query surface. States cycle idle -> recording -> captured ->
//! analyzing -> result_ready for the life of the session; no transition is
//! fatal to the process.
//!
//! The inner mutex is never held across the remote capability call. While an
//! analysis is in flight the session can still be reset or re-captured;
//! in-flight requests carry a token, and a verdict whose token is no longer
//! current is discarded rather than reapplied to a stale state.

use chrono::{DateTime, Utc};
use std::mem;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisClient, AnalysisError, AnalysisResult};
use crate::audio::{
    AudioPayload, CaptureBackend, CaptureConfig, CaptureError, CaptureFactory, ClipRecorder,
    EncodedAudio,
};
use crate::history::{HistoryEntry, HistoryLog, HistoryStore};

use super::state::{SessionState, SessionStatus};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("No captured audio to analyze")]
    NoCapturedAudio,

    #[error("An analysis is already in flight")]
    AnalysisInFlight,

    #[error("Analysis was superseded by a session reset")]
    Superseded,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Successful analysis plus an optional persistence warning
#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub result: AnalysisResult,
    /// Set when the durable save failed; in-memory history is still intact
    pub persist_warning: Option<String>,
}

enum Phase {
    Idle,
    Recording {
        backend: Box<dyn CaptureBackend>,
        clip: JoinHandle<ClipRecorder>,
        started_at: DateTime<Utc>,
    },
    Captured {
        payload: AudioPayload,
    },
    Analyzing {
        payload: AudioPayload,
        token: Uuid,
    },
    ResultReady {
        payload: AudioPayload,
        result: AnalysisResult,
    },
}

impl Phase {
    fn state(&self) -> SessionState {
        match self {
            Phase::Idle => SessionState::Idle,
            Phase::Recording { .. } => SessionState::Recording,
            Phase::Captured { .. } => SessionState::Captured,
            Phase::Analyzing { .. } => SessionState::Analyzing,
            Phase::ResultReady { .. } => SessionState::ResultReady,
        }
    }

    fn payload(&self) -> Option<&AudioPayload> {
        match self {
            Phase::Captured { payload }
            | Phase::Analyzing { payload, .. }
            | Phase::ResultReady { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

struct Inner {
    phase: Phase,
    log: HistoryLog,
}

pub struct SessionController {
    inner: Mutex<Inner>,
    factory: Box<dyn CaptureFactory>,
    analysis: AnalysisClient,
    store: HistoryStore,
    capture_config: CaptureConfig,
}

impl SessionController {
    /// Create a controller, loading history from the durable slot
    pub fn new(
        factory: Box<dyn CaptureFactory>,
        analysis: AnalysisClient,
        store: HistoryStore,
        capture_config: CaptureConfig,
    ) -> Self {
        let log = store.load();
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                log,
            }),
            factory,
            analysis,
            store,
            capture_config,
        }
    }

    /// Begin microphone capture
    ///
    /// Rejected while already recording. Any previously captured audio is
    /// discarded and a pending analysis is abandoned. Device failures leave
    /// the session idle.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;

        if matches!(inner.phase, Phase::Recording { .. }) {
            return Err(SessionError::AlreadyRecording);
        }

        // Discard previous capture / abandon any in-flight analysis
        inner.phase = Phase::Idle;

        let mut backend = self.factory.create()?;
        let rx = backend.start().await?;

        let recorder = ClipRecorder::new(&self.capture_config);
        let clip = tokio::spawn(recorder.collect(rx));

        info!("Recording started ({})", backend.name());
        inner.phase = Phase::Recording {
            backend,
            clip,
            started_at: Utc::now(),
        };

        Ok(())
    }

    /// Stop capture and finalize the clip into a payload
    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;

        match mem::replace(&mut inner.phase, Phase::Idle) {
            Phase::Recording {
                mut backend, clip, ..
            } => {
                // Stopping the backend closes the frame channel; the clip
                // task drains it and completes. The device is released even
                // on the error paths below because the backend drops here.
                backend.stop().await?;

                let recorder = clip.await.map_err(|e| {
                    CaptureError::Stream(format!("clip task failed: {}", e))
                })?;
                let payload = recorder.finalize()?;

                info!(
                    "Capture complete: {} bytes of {}",
                    payload.size_bytes(),
                    payload.mime_type
                );
                inner.phase = Phase::Captured { payload };
                Ok(())
            }
            other => {
                inner.phase = other;
                Err(SessionError::NotRecording)
            }
        }
    }

    /// Ingest a user-selected audio file
    ///
    /// Rejected while recording; a non-audio MIME type is rejected with no
    /// state change and no device interaction.
    pub async fn select_file(&self, mime_type: &str, bytes: Vec<u8>) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;

        if matches!(inner.phase, Phase::Recording { .. }) {
            return Err(SessionError::AlreadyRecording);
        }

        let payload = AudioPayload::from_file(mime_type, bytes)?;

        info!(
            "File selected: {} bytes of {}",
            payload.size_bytes(),
            payload.mime_type
        );
        inner.phase = Phase::Captured { payload };
        Ok(())
    }

    /// Run the capture through the analysis capability and append the verdict
    /// to history
    ///
    /// Valid from `captured` and `result_ready` (re-analyzing the retained
    /// clip). At most one analysis is in flight at a time. On failure the
    /// session returns to `captured` with the same payload, ready for retry.
    pub async fn analyze(&self) -> Result<AnalyzeOutcome, SessionError> {
        let (encoded, prior, token) = {
            let mut inner = self.inner.lock().await;

            let payload = match mem::replace(&mut inner.phase, Phase::Idle) {
                Phase::Captured { payload } => payload,
                Phase::ResultReady { payload, .. } => payload,
                other @ Phase::Analyzing { .. } => {
                    inner.phase = other;
                    return Err(SessionError::AnalysisInFlight);
                }
                other => {
                    inner.phase = other;
                    return Err(SessionError::NoCapturedAudio);
                }
            };

            let token = Uuid::new_v4();
            let encoded = EncodedAudio::encode(&payload);
            let prior = inner.log.results();
            inner.phase = Phase::Analyzing { payload, token };

            info!("Analysis {} started ({} prior result(s))", token, prior.len());
            (encoded, prior, token)
        };

        // Lock released: resets and new captures stay possible while the
        // capability call is in flight.
        let outcome = self.analysis.analyze(&encoded, &prior).await;

        let mut inner = self.inner.lock().await;

        let still_current =
            matches!(&inner.phase, Phase::Analyzing { token: t, .. } if *t == token);
        if !still_current {
            warn!("Discarding analysis {}: session moved on", token);
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(result) => {
                let entry = HistoryEntry::new(result.clone(), encoded);
                inner.log = inner.log.append(entry);

                let persist_warning = match self.store.save(&inner.log) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!("History not persisted: {}", e);
                        Some(e.to_string())
                    }
                };

                if let Phase::Analyzing { payload, .. } =
                    mem::replace(&mut inner.phase, Phase::Idle)
                {
                    inner.phase = Phase::ResultReady {
                        payload,
                        result: result.clone(),
                    };
                }

                Ok(AnalyzeOutcome {
                    result,
                    persist_warning,
                })
            }
            Err(e) => {
                // Keep the captured audio so the user can retry
                if let Phase::Analyzing { payload, .. } =
                    mem::replace(&mut inner.phase, Phase::Idle)
                {
                    inner.phase = Phase::Captured { payload };
                }
                Err(SessionError::Analysis(e))
            }
        }
    }

    /// Return to idle, discarding any capture and abandoning any in-flight
    /// analysis. Infallible and idempotent; history is untouched.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;

        match mem::replace(&mut inner.phase, Phase::Idle) {
            Phase::Recording {
                mut backend, clip, ..
            } => {
                if let Err(e) = backend.stop().await {
                    warn!("Device release on reset failed: {}", e);
                }
                clip.abort();
                info!("Reset: recording abandoned");
            }
            Phase::Analyzing { token, .. } => {
                info!("Reset: abandoning in-flight analysis {}", token);
            }
            Phase::Idle => {}
            _ => info!("Reset: captured audio discarded"),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;

        let recording_elapsed_secs = match &inner.phase {
            Phase::Recording { started_at, .. } => {
                Some((Utc::now() - *started_at).num_seconds().max(0) as u64)
            }
            _ => None,
        };

        let last_result = match &inner.phase {
            Phase::ResultReady { result, .. } => Some(result.clone()),
            _ => None,
        };

        SessionStatus {
            state: inner.phase.state(),
            recording_elapsed_secs,
            captured_mime_type: inner.phase.payload().map(|p| p.mime_type.clone()),
            captured_size_bytes: inner.phase.payload().map(|p| p.size_bytes()),
            last_result,
            history_len: inner.log.len(),
        }
    }

    /// History entries, newest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().await.log.entries().to_vec()
    }

    /// The currently held capture, for playback preview
    pub async fn captured_audio(&self) -> Option<AudioPayload> {
        self.inner.lock().await.phase.payload().cloned()
    }
}
