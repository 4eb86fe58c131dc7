//! Data-URI encoding of audio payloads
//!
//! `data:<mime>;base64,<data>` is both the wire format sent to the analysis
//! capability and the persisted representation inside history entries, so
//! entries stay playable without re-fetching the original bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::payload::AudioPayload;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Not a data URI (missing `data:` scheme)")]
    MissingScheme,

    #[error("Data URI is missing the `;base64,` marker")]
    MissingBase64Marker,

    #[error("Data URI has an empty MIME type")]
    EmptyMimeType,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Self-describing base64 text encoding of an [`AudioPayload`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedAudio(String);

impl EncodedAudio {
    /// Encode a payload into a data URI. Total over valid payloads.
    pub fn encode(payload: &AudioPayload) -> Self {
        Self(format!(
            "data:{};base64,{}",
            payload.mime_type,
            STANDARD.encode(&payload.bytes)
        ))
    }

    /// Validate an externally supplied data URI without decoding the body
    pub fn parse(uri: String) -> Result<Self, EncodingError> {
        split_data_uri(&uri)?;
        Ok(Self(uri))
    }

    /// Decode back into the original bytes and MIME type
    pub fn decode(&self) -> Result<AudioPayload, EncodingError> {
        let (mime, body) = split_data_uri(&self.0)?;
        let bytes = STANDARD.decode(body)?;
        Ok(AudioPayload::new(bytes, mime))
    }

    pub fn mime_type(&self) -> Result<&str, EncodingError> {
        Ok(split_data_uri(&self.0)?.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn split_data_uri(uri: &str) -> Result<(&str, &str), EncodingError> {
    let rest = uri.strip_prefix("data:").ok_or(EncodingError::MissingScheme)?;
    let (mime, body) = rest
        .split_once(";base64,")
        .ok_or(EncodingError::MissingBase64Marker)?;
    if mime.is_empty() {
        return Err(EncodingError::EmptyMimeType);
    }
    Ok((mime, body))
}
