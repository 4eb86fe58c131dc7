//! Microphone capture backend using cpal
//!
//! The cpal stream is not `Send`, so the device is opened and held on a
//! dedicated OS thread. Frames are bridged back to async land over an mpsc
//! channel; the audio callback never blocks (frames are dropped with a
//! warning if the channel is full).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};

/// Frames buffered between the audio callback and the consumer
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Microphone capture backend
pub struct MicrophoneBackend {
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.is_capturing.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceAccess(
                "capture is already running".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.is_capturing.store(true, Ordering::SeqCst);
        let is_capturing = self.is_capturing.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            run_capture(config, is_capturing, frame_tx, ready_tx);
        });

        // Wait for the capture thread to report whether the device opened
        match ready_rx.await {
            Ok(Ok(())) => {
                self.thread_handle = Some(handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CaptureError::DeviceAccess(
                    "capture thread exited before the device was ready".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.is_capturing.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| CaptureError::Stream(format!("capture thread join failed: {}", e)))?
                .map_err(|_| CaptureError::Stream("capture thread panicked".to_string()))?;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // Release the device even if the backend is dropped mid-capture
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run capture on the dedicated thread, holding the cpal stream alive until
/// the capturing flag clears
fn run_capture(
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
) {
    match open_stream(&config, is_capturing.clone(), frame_tx) {
        Ok(stream) => {
            if ready_tx.send(Ok(())).is_err() {
                return;
            }
            while is_capturing.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            // Dropping the stream closes the device and the frame channel
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

fn open_stream(
    config: &CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceAccess("no audio input device found".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceAccess(e.to_string()))?;
    let sample_format = supported.sample_format();

    let stream_config: cpal::StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;

    info!(
        "Using audio input device: {} ({} Hz, {} channels)",
        device_name, sample_rate, channels
    );

    let frame_len = ((sample_rate as u64 * config.buffer_duration_ms / 1000) as usize
        * channels as usize)
        .max(1);
    let mut emitter = FrameEmitter::new(frame_len, sample_rate, channels, frame_tx);

    let err_callback = |err| {
        error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    if !is_capturing.load(Ordering::SeqCst) {
                        return;
                    }
                    emitter.push(data);
                },
                err_callback,
                None,
            )
            .map_err(|e| CaptureError::DeviceAccess(e.to_string()))?,
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    if !is_capturing.load(Ordering::SeqCst) {
                        return;
                    }
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    emitter.push(&converted);
                },
                err_callback,
                None,
            )
            .map_err(|e| CaptureError::DeviceAccess(e.to_string()))?,
        other => {
            return Err(CaptureError::DeviceAccess(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| CaptureError::DeviceAccess(e.to_string()))?;

    Ok(stream)
}

/// Accumulates callback samples and emits fixed-size frames
struct FrameEmitter {
    buffer: Vec<i16>,
    frame_len: usize,
    frames_sent: u64,
    sample_rate: u32,
    channels: u16,
    tx: mpsc::Sender<AudioFrame>,
}

impl FrameEmitter {
    fn new(frame_len: usize, sample_rate: u32, channels: u16, tx: mpsc::Sender<AudioFrame>) -> Self {
        Self {
            buffer: Vec::with_capacity(frame_len * 2),
            frame_len,
            frames_sent: 0,
            sample_rate,
            channels,
            tx,
        }
    }

    fn push(&mut self, data: &[i16]) {
        self.buffer.extend_from_slice(data);

        while self.buffer.len() >= self.frame_len {
            let samples: Vec<i16> = self.buffer.drain(..self.frame_len).collect();
            let frame_ms = (self.frame_len as u64 / self.channels.max(1) as u64) * 1000
                / self.sample_rate.max(1) as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: self.frames_sent * frame_ms,
            };

            if self.tx.try_send(frame).is_err() {
                warn!("Dropping audio frame: channel full or closed");
            }

            self.frames_sent += 1;
        }
    }
}
