//! # Sync Service
//!
//! Full-catalog backup to a single remote blob.
//!
//! ## Overview
//!
//! The service holds two pieces of session state:
//! - the bearer credential, persisted in the [`SecureStore`]
//! - the id of the remote backup blob, cached in the [`SettingsStore`]
//!
//! Every upload sends the whole catalog and every download returns the whole
//! catalog. There is no merge and no concurrency control: the last upload
//! wins.
//!
//! ## Workflow
//!
//! ### Upload
//! 1. Serialize the catalog and check that it parses back
//! 2. Reject payloads above the hard limit, warn above the soft limit
//! 3. Update the cached blob in place, or create a new one and cache its id
//!
//! ### Download
//! 1. Without a cached id, scan every blob for the backup description
//! 2. Fetch the blob; re-fetch from the raw location if the file is truncated
//! 3. Reject empty or HTML content, then parse the catalog

use crate::error::{Result, SyncError};
use crate::payload::{digest, prepare_upload, read_download};
use bridge_traits::error::BridgeError;
use bridge_traits::storage::{RemoteBlob, RemoteBlobStore, SecureStore, SettingsStore};
use core_library::models::Collection;
use core_runtime::config::SyncLimits;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Description that marks the backup blob among all blobs of the account
pub const BACKUP_DESCRIPTION: &str = "Image Catalog Backup";

/// Name of the single file inside the backup blob
pub const BACKUP_FILE_NAME: &str = "image-catalog.json";

const CREDENTIAL_KEY: &str = "sync.credential";
const LOGIN_KEY: &str = "sync.login";
const REMOTE_ID_KEY: &str = "sync.remote_id";
const LAST_DIGEST_KEY: &str = "sync.last_upload_sha256";

#[derive(Debug, Default, Clone)]
struct SessionState {
    credential: Option<String>,
    login: Option<String>,
    remote_id: Option<String>,
    last_upload_digest: Option<String>,
}

/// Snapshot of the sync session, safe to hand to a UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub signed_in: bool,
    pub login: Option<String>,
    pub remote_id: Option<String>,
    /// SHA-256 of the last payload this client uploaded
    pub last_upload_digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub remote_id: String,
    pub bytes: u64,
    /// A new blob was created instead of updating the cached one
    pub created: bool,
    /// The payload was above the soft limit
    pub size_warning: bool,
    pub digest: String,
}

/// Result of a download, telling "no backup" apart from an empty backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Blob the catalog came from, `None` when the account has no backup
    pub remote_id: Option<String>,
    pub collections: Vec<Collection>,
}

impl DownloadReport {
    fn no_backup() -> Self {
        Self {
            remote_id: None,
            collections: Vec::new(),
        }
    }

    pub fn found(&self) -> bool {
        self.remote_id.is_some()
    }
}

pub struct SyncService {
    remote: Arc<dyn RemoteBlobStore>,
    secure_store: Arc<dyn SecureStore>,
    settings: Arc<dyn SettingsStore>,
    limits: SyncLimits,
    events: EventBus,
    state: RwLock<SessionState>,
}

impl SyncService {
    pub fn new(
        remote: Arc<dyn RemoteBlobStore>,
        secure_store: Arc<dyn SecureStore>,
        settings: Arc<dyn SettingsStore>,
        limits: SyncLimits,
        events: EventBus,
    ) -> Self {
        Self {
            remote,
            secure_store,
            settings,
            limits,
            events,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn limits(&self) -> &SyncLimits {
        &self.limits
    }

    /// Reload the persisted credential and cached remote id.
    ///
    /// The credential is not re-verified; the next remote call will report
    /// [`SyncError::Auth`] if it has been revoked.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<SyncStatus> {
        let credential = self
            .secure_store
            .get_secret(CREDENTIAL_KEY)
            .await
            .map_err(SyncError::storage)?
            .map(String::from_utf8)
            .transpose()
            .map_err(|e| SyncError::Storage(format!("Stored credential is not UTF-8: {}", e)))?;
        let login = self.setting(LOGIN_KEY).await?;
        let remote_id = self.setting(REMOTE_ID_KEY).await?;
        let last_upload_digest = self.setting(LAST_DIGEST_KEY).await?;

        let mut state = self.state.write().await;
        *state = SessionState {
            credential,
            login,
            remote_id,
            last_upload_digest,
        };

        info!(
            signed_in = state.credential.is_some(),
            has_remote_id = state.remote_id.is_some(),
            "Restored sync session"
        );
        Ok(Self::snapshot(&state))
    }

    /// Verify `credential` and persist it.
    ///
    /// A rejected credential is never stored.
    #[instrument(skip(self, credential))]
    pub async fn login(&self, credential: &str) -> Result<SyncStatus> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(SyncError::Validation("Credential cannot be empty".to_string()));
        }

        let login = self
            .remote
            .verify_credential(credential)
            .await
            .map_err(|e| match e {
                BridgeError::Network(msg) => SyncError::Network(msg),
                other => SyncError::Auth(other.to_string()),
            })?;

        self.secure_store
            .set_secret(CREDENTIAL_KEY, credential.as_bytes())
            .await
            .map_err(SyncError::storage)?;

        let mut state = self.state.write().await;
        if state.login.as_deref() != Some(login.as_str()) {
            // The cached blob belongs to another account
            state.remote_id = None;
            state.last_upload_digest = None;
            self.settings.delete(REMOTE_ID_KEY).await.map_err(SyncError::storage)?;
            self.settings.delete(LAST_DIGEST_KEY).await.map_err(SyncError::storage)?;
        }
        self.settings
            .set_string(LOGIN_KEY, &login)
            .await
            .map_err(SyncError::storage)?;
        state.credential = Some(credential.to_string());
        state.login = Some(login.clone());

        info!(login = %login, "Signed in to remote backup");
        self.emit(SyncEvent::SignedIn { login });
        Ok(Self::snapshot(&state))
    }

    /// Forget the credential and cached remote id. Local data is untouched.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.write().await;

        self.secure_store
            .delete_secret(CREDENTIAL_KEY)
            .await
            .map_err(SyncError::storage)?;
        for key in [LOGIN_KEY, REMOTE_ID_KEY, LAST_DIGEST_KEY] {
            self.settings.delete(key).await.map_err(SyncError::storage)?;
        }
        *state = SessionState::default();

        info!("Signed out of remote backup");
        self.emit(SyncEvent::SignedOut);
        Ok(())
    }

    pub async fn status(&self) -> SyncStatus {
        Self::snapshot(&*self.state.read().await)
    }

    /// Upload the whole catalog, replacing the remote copy.
    #[instrument(skip(self, collections), fields(collections = collections.len()))]
    pub async fn upload(&self, collections: &[Collection]) -> Result<UploadReport> {
        let result = self.upload_inner(collections).await;
        if let Err(e) = &result {
            self.report_failure("upload", e);
        }
        result
    }

    async fn upload_inner(&self, collections: &[Collection]) -> Result<UploadReport> {
        let payload = prepare_upload(collections)?;
        let bytes = payload.len() as u64;

        if bytes > self.limits.hard_limit_bytes {
            warn!(bytes, limit = self.limits.hard_limit_bytes, "Backup rejected: too large");
            return Err(SyncError::SizeLimit {
                bytes,
                limit: self.limits.hard_limit_bytes,
            });
        }

        let size_warning = bytes > self.limits.soft_limit_bytes;
        if size_warning {
            warn!(bytes, soft_limit = self.limits.soft_limit_bytes, "Backup payload is large");
            self.emit(SyncEvent::SizeWarning {
                bytes,
                soft_limit: self.limits.soft_limit_bytes,
            });
        }

        let mut state = self.state.write().await;
        let credential = Self::require_credential(&state)?;
        self.emit(SyncEvent::UploadStarted { bytes });

        let (blob, created) = match state.remote_id.clone() {
            Some(id) => match self
                .remote
                .update_blob(&credential, &id, BACKUP_FILE_NAME, &payload)
                .await
            {
                Ok(blob) => (blob, false),
                Err(BridgeError::NotFound(_)) => {
                    warn!(remote_id = %id, "Cached backup no longer exists; creating a new one");
                    (self.create_backup(&credential, &payload).await?, true)
                }
                Err(e) => return Err(e.into()),
            },
            None => (self.create_backup(&credential, &payload).await?, true),
        };

        let payload_digest = digest(&payload);
        self.cache_remote_id(&mut state, &blob.id).await?;
        self.settings
            .set_string(LAST_DIGEST_KEY, &payload_digest)
            .await
            .map_err(SyncError::storage)?;
        state.last_upload_digest = Some(payload_digest.clone());

        info!(remote_id = %blob.id, bytes, created, "Backup uploaded");
        self.emit(SyncEvent::UploadCompleted {
            remote_id: blob.id.clone(),
            bytes,
            created,
        });

        Ok(UploadReport {
            remote_id: blob.id,
            bytes,
            created,
            size_warning,
            digest: payload_digest,
        })
    }

    /// Download the remote catalog.
    ///
    /// Returns an empty catalog when no backup exists yet.
    pub async fn download(&self) -> Result<Vec<Collection>> {
        Ok(self.download_report().await?.collections)
    }

    /// Download the remote catalog along with the blob it came from.
    ///
    /// A backup holding an empty catalog reports its `remote_id`; only a
    /// missing backup reports `None`.
    #[instrument(skip(self))]
    pub async fn download_report(&self) -> Result<DownloadReport> {
        let result = self.download_inner().await;
        if let Err(e) = &result {
            self.report_failure("download", e);
        }
        result
    }

    async fn download_inner(&self) -> Result<DownloadReport> {
        let mut state = self.state.write().await;
        let credential = Self::require_credential(&state)?;

        let remote_id = match state.remote_id.clone() {
            Some(id) => id,
            None => match self.discover(&credential).await? {
                Some(id) => {
                    self.cache_remote_id(&mut state, &id).await?;
                    id
                }
                None => {
                    info!("No remote backup found");
                    self.emit(SyncEvent::DownloadCompleted {
                        remote_id: None,
                        collections: 0,
                    });
                    return Ok(DownloadReport::no_backup());
                }
            },
        };

        let blob = match self.remote.get_blob(&credential, &remote_id).await {
            Ok(blob) => blob,
            Err(BridgeError::NotFound(_)) => {
                warn!(remote_id = %remote_id, "Cached backup no longer exists");
                state.remote_id = None;
                self.settings
                    .delete(REMOTE_ID_KEY)
                    .await
                    .map_err(SyncError::storage)?;
                self.emit(SyncEvent::DownloadCompleted {
                    remote_id: None,
                    collections: 0,
                });
                return Ok(DownloadReport::no_backup());
            }
            Err(e) => return Err(e.into()),
        };

        let content = self.file_content(&credential, &blob).await?;
        let collections = read_download(&content)?;

        info!(remote_id = %remote_id, collections = collections.len(), "Backup downloaded");
        self.emit(SyncEvent::DownloadCompleted {
            remote_id: Some(remote_id.clone()),
            collections: collections.len(),
        });
        Ok(DownloadReport {
            remote_id: Some(remote_id),
            collections,
        })
    }

    /// Scan every blob for the one carrying the backup description.
    async fn discover(&self, credential: &str) -> Result<Option<String>> {
        let blobs = self.remote.list_blobs(credential).await?;
        let found = blobs
            .into_iter()
            .find(|blob| blob.description.as_deref() == Some(BACKUP_DESCRIPTION))
            .map(|blob| blob.id);

        debug!(found = found.is_some(), "Discovery scan finished");
        Ok(found)
    }

    async fn file_content(&self, credential: &str, blob: &RemoteBlob) -> Result<String> {
        let file = blob.file(BACKUP_FILE_NAME).ok_or(SyncError::EmptyContent)?;

        if file.truncated {
            let raw_url = file.raw_url.as_deref().ok_or_else(|| {
                SyncError::ContentShape("truncated file has no raw location".to_string())
            })?;
            debug!(remote_id = %blob.id, "Backup file truncated; fetching raw content");
            return Ok(self.remote.fetch_raw(credential, raw_url).await?);
        }

        Ok(file.content.clone().unwrap_or_default())
    }

    async fn create_backup(&self, credential: &str, payload: &str) -> Result<RemoteBlob> {
        Ok(self
            .remote
            .create_blob(credential, BACKUP_DESCRIPTION, BACKUP_FILE_NAME, payload)
            .await?)
    }

    async fn cache_remote_id(&self, state: &mut SessionState, id: &str) -> Result<()> {
        self.settings
            .set_string(REMOTE_ID_KEY, id)
            .await
            .map_err(SyncError::storage)?;
        state.remote_id = Some(id.to_string());
        Ok(())
    }

    async fn setting(&self, key: &str) -> Result<Option<String>> {
        self.settings.get_string(key).await.map_err(SyncError::storage)
    }

    fn require_credential(state: &SessionState) -> Result<String> {
        state
            .credential
            .clone()
            .ok_or_else(|| SyncError::Auth("Not signed in".to_string()))
    }

    fn snapshot(state: &SessionState) -> SyncStatus {
        SyncStatus {
            signed_in: state.credential.is_some(),
            login: state.login.clone(),
            remote_id: state.remote_id.clone(),
            last_upload_digest: state.last_upload_digest.clone(),
        }
    }

    fn report_failure(&self, operation: &str, error: &SyncError) {
        warn!(operation, error = %error, "Sync operation failed");
        self.emit(SyncEvent::Failed {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.emit(CoreEvent::Sync(event));
    }
}
