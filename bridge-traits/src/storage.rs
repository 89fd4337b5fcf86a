//! Storage Abstractions
//!
//! Provides platform-agnostic traits for secure credential storage, key-value
//! settings storage, and the remote single-document blob store used for backups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service / libsecret
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Use platform-provided secure storage when available
/// - Never log or expose sensitive data
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("sync_credential", token.as_bytes()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value for `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting an absent key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// Key-value settings storage trait
///
/// Used for small non-secret state such as the cached remote backup id.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_backup(store: &dyn SettingsStore, id: &str) -> Result<()> {
///     store.set_string("sync.remote_id", id).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

/// A single file held by a remote blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBlobFile {
    pub name: String,
    /// Inline content. May be a prefix of the real content when `truncated` is set.
    pub content: Option<String>,
    /// Whether the inline content was cut short by the transport.
    pub truncated: bool,
    /// Location of the full, untruncated content.
    pub raw_url: Option<String>,
    pub size: Option<u64>,
}

/// Metadata of a remote blob, optionally with its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBlob {
    pub id: String,
    pub description: Option<String>,
    pub files: Vec<RemoteBlobFile>,
}

impl RemoteBlob {
    /// Find a file by name
    pub fn file(&self, name: &str) -> Option<&RemoteBlobFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Remote single-document store
///
/// Abstracts a provider that stores named text files inside opaque blobs
/// owned by a bearer credential. Implementations perform no merging: every
/// write replaces the named file wholesale.
///
/// Error mapping expected from implementations:
/// - 401/403 → [`BridgeError::Unauthorized`](crate::error::BridgeError::Unauthorized)
/// - 404 → [`BridgeError::NotFound`](crate::error::BridgeError::NotFound)
/// - transport failures → [`BridgeError::Network`](crate::error::BridgeError::Network)
#[async_trait]
pub trait RemoteBlobStore: Send + Sync {
    /// Check the credential against the provider's identity endpoint.
    /// Returns the account login on success.
    async fn verify_credential(&self, credential: &str) -> Result<String>;

    /// List every blob owned by the credential (all pages).
    async fn list_blobs(&self, credential: &str) -> Result<Vec<RemoteBlob>>;

    /// Fetch a blob's metadata including inline file content.
    async fn get_blob(&self, credential: &str, id: &str) -> Result<RemoteBlob>;

    /// Create a new private blob holding a single file. Returns the created blob.
    async fn create_blob(
        &self,
        credential: &str,
        description: &str,
        file_name: &str,
        content: &str,
    ) -> Result<RemoteBlob>;

    /// Replace the named file of an existing blob.
    async fn update_blob(
        &self,
        credential: &str,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<RemoteBlob>;

    /// Fetch full file content from a raw location.
    async fn fetch_raw(&self, credential: &str, raw_url: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_blob_file_lookup() {
        let blob = RemoteBlob {
            id: "abc".to_string(),
            description: Some("backup".to_string()),
            files: vec![RemoteBlobFile {
                name: "data.json".to_string(),
                content: Some("[]".to_string()),
                truncated: false,
                raw_url: None,
                size: Some(2),
            }],
        };

        assert_eq!(blob.file("data.json").and_then(|f| f.content.as_deref()), Some("[]"));
        assert!(blob.file("other.json").is_none());
    }
}
