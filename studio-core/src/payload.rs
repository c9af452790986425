//! Image payloads exchanged with the generation service.
//!
//! Layers store their image source as a string (usually a `data:` URI); the
//! service works on raw bytes. [`ImagePayload`] converts between the two.

use base64::Engine;

use crate::{StudioError, StudioResult};

/// Raw image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Create a payload.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Encode the bytes as base64 (standard alphabet, padded).
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Encode as a base64 `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Decode a `data:` URI, either base64 or percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidPayload`] if the string is not a data URI
    /// or its body cannot be decoded.
    pub fn from_data_uri(uri: &str) -> StudioResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::InvalidPayload("not a data URI".to_string()))?;
        let (metadata, body) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::InvalidPayload("data URI is missing a comma".to_string()))?;

        let mut parts = metadata.split(';');
        let mime_type = match parts.next() {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => "text/plain".to_string(),
        };
        let is_base64 = parts.any(|p| p == "base64");

        let bytes = if is_base64 {
            base64::engine::general_purpose::STANDARD
                .decode(body)
                .map_err(|e| StudioError::InvalidPayload(format!("bad base64: {e}")))?
        } else {
            percent_decode(body)?
        };

        Ok(Self { mime_type, bytes })
    }
}

fn percent_decode(input: &str) -> StudioResult<Vec<u8>> {
    let raw = input.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let byte = raw
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| StudioError::InvalidPayload("bad percent escape".to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}
