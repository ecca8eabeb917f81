//! Raw image bytes -> base64 payload with a sniffed media type.

use base64::Engine as _;

use crate::{Error, Result};

/// A base64-encoded image ready to be embedded in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    /// Encode raw bytes. Fails for empty payloads and for formats no provider accepts.
    pub fn encode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::ImageEncodingFailed("image payload is empty".into()));
        }
        let media_type = sniff_media_type(bytes).ok_or_else(|| {
            Error::ImageEncodingFailed(format!(
                "unrecognised image format ({} bytes, expected PNG, JPEG, GIF or WebP)",
                bytes.len()
            ))
        })?;
        Ok(Self {
            media_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// `data:` URL form used by OpenAI-compatible `image_url` parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) const TINY_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];
