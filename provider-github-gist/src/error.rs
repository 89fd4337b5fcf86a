//! Error types for the GitHub Gist provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// GitHub Gist provider errors
#[derive(Error, Debug)]
pub enum GistError {
    /// The token was rejected (401) or lacks the `gist` scope (403)
    #[error("Authentication failed (status {status_code}): {message}")]
    AuthenticationFailed { status_code: u16, message: String },

    #[error("Gist resource not found: {resource}")]
    NotFound { resource: String },

    /// API request returned an error
    #[error("GitHub API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Gist operations
pub type Result<T> = std::result::Result<T, GistError>;

impl GistError {
    /// Classify a non-success response
    pub fn from_status(status_code: u16, resource: &str, body: &[u8]) -> Self {
        let message = api_message(body);
        match status_code {
            401 | 403 => GistError::AuthenticationFailed {
                status_code,
                message,
            },
            404 => GistError::NotFound {
                resource: resource.to_string(),
            },
            _ => GistError::ApiError {
                status_code,
                message,
            },
        }
    }
}

/// GitHub error bodies look like `{"message": "..."}`; fall back to raw text.
fn api_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

impl From<GistError> for BridgeError {
    fn from(error: GistError) -> Self {
        match error {
            GistError::AuthenticationFailed {
                status_code,
                message,
            } => BridgeError::Unauthorized(format!("status {}: {}", status_code, message)),
            GistError::NotFound { resource } => BridgeError::NotFound(resource),
            GistError::ApiError {
                status_code,
                message,
            } if status_code == 429 || status_code >= 500 => BridgeError::Network(format!(
                "GitHub API unavailable (status {}): {}",
                status_code, message
            )),
            GistError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "GitHub API error (status {}): {}",
                status_code, message
            )),
            GistError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GistError::BridgeError(e) => e,
        }
    }
}
