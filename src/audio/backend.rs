use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while acquiring or ingesting audio
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Microphone access failed: {0}")]
    DeviceAccess(String),

    #[error("Selected file is not audio (declared type: {0})")]
    InvalidFileType(String),

    #[error("Capture stream failed: {0}")]
    Stream(String),

    #[error("Failed to finalize recorded clip: {0}")]
    Finalize(String),
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate for finalized clips (frames are decimated if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz is plenty for voice screening
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Audio capture backend trait
///
/// `stop()` must release the capture device on every exit path; dropping a
/// backend mid-capture must release it as well.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes when the backend stops.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio and release the device
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Factory for capture backends
///
/// Injected into the session controller so tests can substitute scripted
/// backends for real hardware.
pub trait CaptureFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError>;
}

/// Factory producing cpal microphone backends
pub struct MicrophoneFactory {
    config: CaptureConfig,
}

impl MicrophoneFactory {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl CaptureFactory for MicrophoneFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        Ok(Box::new(super::mic::MicrophoneBackend::new(
            self.config.clone(),
        )))
    }
}
