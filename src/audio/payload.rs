use super::backend::CaptureError;

/// Raw captured audio plus its declared MIME type
///
/// Immutable once produced; the session replaces it wholesale on reset or a
/// new capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioPayload {
    /// MIME type of clips recorded from the microphone
    pub const RECORDED_MIME: &'static str = "audio/wav";

    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Wrap user-selected file bytes, validating the declared MIME type
    pub fn from_file(mime_type: &str, bytes: Vec<u8>) -> Result<Self, CaptureError> {
        if !mime_type.starts_with("audio/") {
            return Err(CaptureError::InvalidFileType(mime_type.to_string()));
        }
        Ok(Self::new(bytes, mime_type))
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}
