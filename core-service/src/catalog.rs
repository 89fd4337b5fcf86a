//! Catalog façade
//!
//! [`CatalogService`] owns the store, codec, event bus and the optional sync
//! session, and exposes the operations a host UI calls.

use crate::error::{CoreError, Result};
use bridge_traits::prompt::{ConfirmationPrompt, ConfirmationRequest};
use bridge_traits::storage::RemoteBlobStore;
use bridge_traits::time::Clock;
use core_imaging::{compress_batch_with_events, is_data_url, CodecOptions, ImageCodec};
use core_library::{
    apply_catalog, create_pool, export_store, insert_at_top, parse_catalog, Collection,
    CollectionDraft, CollectionReorder, CollectionStore, DatabaseConfig, ImportPolicy,
    ImportSummary, LibraryError, SqliteCollectionStore,
};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, Receiver};
use core_sync::{DownloadReport, SyncService, SyncStatus, UploadReport};
use provider_github_gist::GistConnector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a bulk compression pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionReport {
    pub images_total: usize,
    pub images_recompressed: usize,
    pub images_failed: usize,
    /// Collections whose stored images changed and were written back
    pub collections_updated: usize,
}

/// Outcome of [`CatalogService::pull_from_remote`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The account has no backup blob; the local catalog was left alone.
    NoBackup,
    /// The user kept the local catalog.
    Declined { incoming: usize },
    Restored(ImportSummary),
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CollectionStore>,
    codec: ImageCodec,
    events: EventBus,
    sync: Option<Arc<SyncService>>,
    prompt: Arc<dyn ConfirmationPrompt>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Open the catalog described by `config`.
    ///
    /// Remote backup is enabled when the config carries an HTTP client; the
    /// Gist connector is pointed at `config.remote_api_base`.
    pub async fn new(config: CatalogConfig) -> Result<Self> {
        let remote = config.http_client.clone().map(|client| {
            Arc::new(GistConnector::with_api_base(
                client,
                config.remote_api_base.clone(),
            )) as Arc<dyn RemoteBlobStore>
        });
        Self::with_remote_store(config, remote).await
    }

    /// Open the catalog with an explicit remote blob store (or none).
    #[instrument(skip_all, fields(database = %config.database_path.display()))]
    pub async fn with_remote_store(
        config: CatalogConfig,
        remote: Option<Arc<dyn RemoteBlobStore>>,
    ) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::new(config.database_path.clone())).await?;
        let store: Arc<dyn CollectionStore> = Arc::new(SqliteCollectionStore::new(pool));
        let events = EventBus::new(config.event_buffer_size);

        let sync = remote.map(|remote| {
            Arc::new(SyncService::new(
                remote,
                config.secure_store.clone(),
                config.settings_store.clone(),
                config.sync_limits,
                events.clone(),
            ))
        });

        if let Some(sync) = &sync {
            // A broken credential store must not keep the local catalog closed
            if let Err(e) = sync.restore_session().await {
                warn!(error = %e, "Could not restore sync session; starting signed out");
            }
        }

        info!(remote_backup = sync.is_some(), "Catalog service ready");

        Ok(Self {
            store,
            codec: ImageCodec::new(CodecOptions::from(&config.codec)),
            events,
            sync,
            prompt: config.confirmation_prompt.clone(),
            clock: config.clock.clone(),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> Arc<dyn CollectionStore> {
        Arc::clone(&self.store)
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    // ------------------------------------------------------------------
    // Local catalog
    // ------------------------------------------------------------------

    /// Every collection in listing order.
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        Ok(self.store.get(id).await?)
    }

    /// Create a collection from a draft and place it at the top of the listing.
    #[instrument(skip(self, draft), fields(title = %draft.title_primary))]
    pub async fn create_collection(&self, draft: CollectionDraft) -> Result<Collection> {
        draft.validate().map_err(|message| LibraryError::Validation {
            field: "titlePrimary".to_string(),
            message,
        })?;

        let collection = draft.into_collection(self.clock.now());
        let created = insert_at_top(self.store.as_ref(), collection).await?;

        self.emit(LibraryEvent::CollectionCreated {
            collection_id: created.id.clone(),
            title: created.title_primary.clone(),
        });
        Ok(created)
    }

    /// Persist an edited collection as a whole.
    #[instrument(skip(self, collection), fields(collection_id = %collection.id))]
    pub async fn save_collection(&self, collection: &Collection) -> Result<()> {
        self.store.put_one(collection).await?;
        self.emit(LibraryEvent::CollectionSaved {
            collection_id: collection.id.clone(),
        });
        Ok(())
    }

    /// Returns whether a record was removed.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete_one(id).await?;
        if deleted {
            self.emit(LibraryEvent::CollectionDeleted {
                collection_id: id.to_string(),
            });
        }
        Ok(deleted)
    }

    /// A click-driven reorder session over the current listing.
    pub async fn reorder_session(&self) -> Result<CollectionReorder> {
        let mut session = CollectionReorder::new(self.store());
        session.load().await?;
        Ok(session)
    }

    /// Exchange the listing positions of two collections.
    #[instrument(skip(self))]
    pub async fn swap_collections(&self, first_id: &str, second_id: &str) -> Result<Vec<Collection>> {
        let mut session = self.reorder_session().await?;
        session.swap(first_id, second_id).await?;

        self.emit(LibraryEvent::CollectionsReordered {
            first_id: first_id.to_string(),
            second_id: second_id.to_string(),
        });
        Ok(session.listing().to_vec())
    }

    /// Encode raw image bytes and store them on one item.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn attach_image(
        &self,
        collection_id: &str,
        item_id: &str,
        bytes: Vec<u8>,
    ) -> Result<Collection> {
        let mut collection =
            self.store
                .get(collection_id)
                .await?
                .ok_or_else(|| LibraryError::NotFound {
                    entity_type: "Collection".to_string(),
                    id: collection_id.to_string(),
                })?;

        let encoded = self.codec.encode(bytes).await?;
        collection.attach_image(item_id, encoded.data_url)?;
        self.save_collection(&collection).await?;
        Ok(collection)
    }

    /// Recompress every stored image with the current codec settings.
    ///
    /// Images that fail keep their old data. Only collections where at least
    /// one image changed are written back, in a single batch.
    #[instrument(skip(self))]
    pub async fn compress_all(&self) -> Result<CompressionReport> {
        let mut collections = self.store.get_all().await?;

        let mut slots = Vec::new();
        let mut images = Vec::new();
        for (c, collection) in collections.iter().enumerate() {
            for (i, item) in collection.items.iter().enumerate() {
                if let Some(url) = item.image_url.as_deref().filter(|url| is_data_url(url)) {
                    slots.push((c, i));
                    images.push(url.to_string());
                }
            }
        }

        let batch = compress_batch_with_events(&self.codec, images, &self.events).await;

        let mut changed = vec![false; collections.len()];
        for ((c, i), image) in slots.into_iter().zip(batch.images) {
            let item = &mut collections[c].items[i];
            if item.image_url.as_deref() != Some(image.as_str()) {
                item.image_url = Some(image);
                changed[c] = true;
            }
        }

        let updated: Vec<Collection> = collections
            .into_iter()
            .zip(changed)
            .filter_map(|(collection, changed)| changed.then_some(collection))
            .collect();
        if !updated.is_empty() {
            self.store.put_many(&updated).await?;
        }

        let report = CompressionReport {
            images_total: batch.succeeded + batch.failed,
            images_recompressed: batch.succeeded,
            images_failed: batch.failed,
            collections_updated: updated.len(),
        };
        info!(?report, "Compression pass finished");
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Pretty-printed JSON of the whole catalog.
    pub async fn export_catalog(&self) -> Result<String> {
        Ok(export_store(self.store.as_ref()).await?)
    }

    /// Import a catalog document, asking the user whether to clear first.
    ///
    /// Accepting restores (atomic clear and write); declining merges by id.
    /// Nothing is asked or written if the document does not parse.
    #[instrument(skip(self, json), fields(bytes = json.len()))]
    pub async fn import_catalog(&self, json: &str) -> Result<ImportSummary> {
        let collections = parse_catalog(json).map_err(LibraryError::from)?;

        let restore = self
            .prompt
            .confirm(ConfirmationRequest::ImportPolicy {
                incoming: collections.len(),
            })
            .await?;
        let policy = if restore {
            ImportPolicy::Restore
        } else {
            ImportPolicy::Merge
        };

        self.apply(&collections, policy).await
    }

    /// Import a catalog document under an explicit policy, without prompting.
    pub async fn import_catalog_with_policy(
        &self,
        json: &str,
        policy: ImportPolicy,
    ) -> Result<ImportSummary> {
        let collections = parse_catalog(json).map_err(LibraryError::from)?;
        self.apply(&collections, policy).await
    }

    async fn apply(&self, collections: &[Collection], policy: ImportPolicy) -> Result<ImportSummary> {
        let summary = apply_catalog(self.store.as_ref(), collections, policy).await?;
        self.emit(LibraryEvent::CatalogImported {
            count: summary.count,
            policy: policy.as_str().to_string(),
        });
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Remote backup
    // ------------------------------------------------------------------

    pub fn sync_enabled(&self) -> bool {
        self.sync.is_some()
    }

    fn sync(&self) -> Result<&SyncService> {
        self.sync.as_deref().ok_or_else(|| CoreError::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "Remote backup is disabled because no HttpClient was configured".to_string(),
        })
    }

    pub async fn login(&self, credential: &str) -> Result<SyncStatus> {
        Ok(self.sync()?.login(credential).await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.sync()?.logout().await?)
    }

    pub async fn sync_status(&self) -> Result<SyncStatus> {
        Ok(self.sync()?.status().await)
    }

    /// Upload the whole local catalog.
    pub async fn upload(&self) -> Result<UploadReport> {
        let sync = self.sync()?;
        let collections = self.store.get_all().await?;
        Ok(sync.upload(&collections).await?)
    }

    /// Download the remote catalog without touching the local one.
    pub async fn download(&self) -> Result<Vec<Collection>> {
        Ok(self.sync()?.download().await?)
    }

    /// Download the backup and, once the user confirms, replace the local
    /// catalog with it.
    #[instrument(skip(self))]
    pub async fn pull_from_remote(&self) -> Result<PullOutcome> {
        let report: DownloadReport = self.sync()?.download_report().await?;
        if !report.found() {
            info!("No remote backup to restore");
            return Ok(PullOutcome::NoBackup);
        }
        // An empty backup is still a catalog: restoring it clears local data
        let incoming = report.collections;

        let local = self.store.count().await?;
        let accepted = self
            .prompt
            .confirm(ConfirmationRequest::ReplaceLocalCatalog {
                local: usize::try_from(local).unwrap_or_default(),
                incoming: incoming.len(),
            })
            .await?;

        if !accepted {
            info!(incoming = incoming.len(), "Restore declined; local catalog kept");
            return Ok(PullOutcome::Declined {
                incoming: incoming.len(),
            });
        }

        let summary = self.apply(&incoming, ImportPolicy::Restore).await?;
        Ok(PullOutcome::Restored(summary))
    }

    fn emit(&self, event: LibraryEvent) {
        let _ = self.events.emit(CoreEvent::Library(event));
    }
}
