//! In-memory clip recording
//!
//! Consumes audio frames from a capture backend, normalizes them to the
//! configured rate and channel count, and finalizes the buffered samples
//! into a single WAV payload.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureConfig, CaptureError};
use super::payload::AudioPayload;

/// Collects capture frames into one in-memory clip
pub struct ClipRecorder {
    target_sample_rate: u32,
    target_channels: u16,
    samples: Vec<i16>,
}

impl ClipRecorder {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            target_sample_rate: config.target_sample_rate,
            target_channels: config.target_channels,
            samples: Vec::new(),
        }
    }

    /// Normalize one frame to the target format and buffer it
    pub fn push(&mut self, frame: AudioFrame) {
        let mut samples = frame.samples;

        if frame.channels > 1 && self.target_channels == 1 {
            samples = downmix_to_mono(&samples, frame.channels);
        }

        if frame.sample_rate > self.target_sample_rate {
            samples = decimate(&samples, frame.sample_rate, self.target_sample_rate);
        } else if frame.sample_rate < self.target_sample_rate {
            // Upsampling is not worth the complexity for screening clips
            warn!(
                "Frame rate {} Hz below target {} Hz, keeping as-is",
                frame.sample_rate, self.target_sample_rate
            );
        }

        self.samples.extend(samples);
    }

    /// Drain the frame channel until the backend closes it
    pub async fn collect(mut self, mut rx: mpsc::Receiver<AudioFrame>) -> Self {
        while let Some(frame) = rx.recv().await {
            self.push(frame);
        }
        self
    }

    /// Number of buffered samples
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Write the buffered samples into an in-memory WAV container
    pub fn finalize(self) -> Result<AudioPayload, CaptureError> {
        let spec = WavSpec {
            channels: self.target_channels,
            sample_rate: self.target_sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;
            for sample in &self.samples {
                writer
                    .write_sample(*sample)
                    .map_err(|e| CaptureError::Finalize(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        }

        let bytes = cursor.into_inner();
        info!(
            "Finalized clip: {} samples, {} bytes",
            self.samples.len(),
            bytes.len()
        );

        Ok(AudioPayload::new(bytes, AudioPayload::RECORDED_MIME))
    }
}

/// Average interleaved channels down to mono
fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|s| *s as i32).sum();
            (sum / chunk.len() as i32) as i16
        })
        .collect()
}

/// Naive decimation from a higher rate to a lower one
fn decimate(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate <= to_rate || to_rate == 0 {
        return samples.to_vec();
    }
    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / step) as usize;
    (0..out_len)
        .map(|i| samples[(i as f64 * step) as usize])
        .collect()
}
