use bridge_traits::error::BridgeError;
use core_library::error::CatalogParseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a downloaded document failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseFailureKind {
    /// Input ended early, usually a cut-off upload or transfer
    Truncated,
    Malformed,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid catalog: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Backup is {bytes} bytes, above the {limit} byte limit")]
    SizeLimit { bytes: u64, limit: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backup could not be parsed ({kind:?}): {message}")]
    Parse {
        kind: ParseFailureKind,
        message: String,
    },

    #[error("Remote backup not found: {0}")]
    NotFound(String),

    /// The content is not a JSON catalog at all (an HTML error page, an object)
    #[error("Unexpected backup content: {0}")]
    ContentShape(String),

    #[error("Backup file is empty")]
    EmptyContent,

    /// Secure or settings store failure
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub(crate) fn storage(error: BridgeError) -> Self {
        SyncError::Storage(error.to_string())
    }
}

impl From<BridgeError> for SyncError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Unauthorized(msg) => SyncError::Auth(msg),
            BridgeError::NotFound(msg) => SyncError::NotFound(msg),
            BridgeError::Network(msg) => SyncError::Network(msg),
            BridgeError::NotAvailable(msg) => SyncError::Storage(msg),
            BridgeError::OperationFailed(msg) => SyncError::Network(msg),
            BridgeError::Io(e) => SyncError::Network(e.to_string()),
        }
    }
}

impl From<CatalogParseError> for SyncError {
    fn from(error: CatalogParseError) -> Self {
        match error {
            CatalogParseError::Truncated(message) => SyncError::Parse {
                kind: ParseFailureKind::Truncated,
                message,
            },
            CatalogParseError::Malformed(message) => SyncError::Parse {
                kind: ParseFailureKind::Malformed,
                message,
            },
            CatalogParseError::NotAnArray => SyncError::ContentShape(error.to_string()),
            CatalogParseError::InvalidRecord { .. } => SyncError::Parse {
                kind: ParseFailureKind::Malformed,
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_mapping() {
        assert!(matches!(
            SyncError::from(BridgeError::Unauthorized("401".into())),
            SyncError::Auth(_)
        ));
        assert!(matches!(
            SyncError::from(BridgeError::NotFound("gist".into())),
            SyncError::NotFound(_)
        ));
        assert!(matches!(
            SyncError::from(BridgeError::Network("reset".into())),
            SyncError::Network(_)
        ));
    }

    #[test]
    fn test_parse_error_mapping() {
        assert!(matches!(
            SyncError::from(CatalogParseError::Truncated("eof".into())),
            SyncError::Parse {
                kind: ParseFailureKind::Truncated,
                ..
            }
        ));
        assert!(matches!(
            SyncError::from(CatalogParseError::NotAnArray),
            SyncError::ContentShape(_)
        ));
    }
}
