//! Backup payload checks shared by upload and download

use crate::error::{Result, SyncError};
use core_library::models::Collection;
use core_library::transfer::{parse_catalog, serialize_catalog};
use sha2::{Digest, Sha256};

/// Serialize the catalog and check that it reads back as a catalog.
pub fn prepare_upload(collections: &[Collection]) -> Result<String> {
    let json = serialize_catalog(collections).map_err(|e| SyncError::Validation(e.to_string()))?;
    parse_catalog(&json).map_err(|e| SyncError::Validation(e.to_string()))?;
    Ok(json)
}

/// Turn downloaded file content into collections.
///
/// Empty content and HTML (an error page served in place of the file) are
/// rejected before JSON parsing.
pub fn read_download(content: &str) -> Result<Vec<Collection>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SyncError::EmptyContent);
    }
    if trimmed.starts_with('<') {
        return Err(SyncError::ContentShape(
            "received HTML instead of a JSON catalog".to_string(),
        ));
    }

    Ok(parse_catalog(trimmed)?)
}

/// Hex SHA-256 of an uploaded payload
pub fn digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseFailureKind;

    #[test]
    fn test_empty_content() {
        assert!(matches!(read_download("  \n"), Err(SyncError::EmptyContent)));
    }

    #[test]
    fn test_html_content() {
        let html = "\n<!DOCTYPE html><html><body>Rate limited</body></html>";
        assert!(matches!(read_download(html), Err(SyncError::ContentShape(_))));
    }

    #[test]
    fn test_truncated_content() {
        let err = read_download(r#"[{"id":"a","createdAt":"2024-01-01T00:00:00Z"},{"id":"#)
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Parse {
                kind: ParseFailureKind::Truncated,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_content() {
        let err = read_download("[1, 2,, 3]").unwrap_err();
        assert!(matches!(
            err,
            SyncError::Parse {
                kind: ParseFailureKind::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn test_object_is_wrong_shape() {
        assert!(matches!(
            read_download(r#"{"collections":[]}"#),
            Err(SyncError::ContentShape(_))
        ));
    }

    #[test]
    fn test_prepare_upload_round_trips() {
        let json = prepare_upload(&[]).unwrap();
        assert_eq!(json, "[]");
        assert!(read_download(&json).unwrap().is_empty());
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest("[]"), digest("[]"));
        assert_ne!(digest("[]"), digest("[ ]"));
        assert_eq!(digest("").len(), 64);
    }
}
