pub mod backend;
pub mod clip;
pub mod encoding;
pub mod mic;
pub mod payload;

pub use backend::{
    AudioFrame, CaptureBackend, CaptureConfig, CaptureError, CaptureFactory, MicrophoneFactory,
};
pub use clip::ClipRecorder;
pub use encoding::{EncodedAudio, EncodingError};
pub use mic::MicrophoneBackend;
pub use payload::AudioPayload;
