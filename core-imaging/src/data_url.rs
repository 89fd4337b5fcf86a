//! `data:` URL helpers

use crate::error::{ImagingError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decoded payload of a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

/// Build a base64 `data:` URL.
pub fn encode_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Split a `data:` URL into its MIME type and raw bytes.
///
/// Only the base64 form carries binary data; any other payload is returned
/// as its literal bytes.
pub fn decode_data_url(value: &str) -> Result<DataUrl> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| ImagingError::InvalidDataUrl("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImagingError::InvalidDataUrl("missing payload separator".to_string()))?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default().trim().to_string();
    let is_base64 = params.any(|param| param.trim().eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| ImagingError::InvalidDataUrl(e.to_string()))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DataUrl { mime_type, data })
}
