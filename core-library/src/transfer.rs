//! Catalog export and import
//!
//! The catalog document is a JSON array of collection records. The same shape
//! is used for export files and the remote backup.

use crate::error::{CatalogParseError, Result};
use crate::models::Collection;
use crate::store::CollectionStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// How an imported catalog is applied to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    /// Discard the local catalog and replace it atomically
    Restore,
    /// Write over matching ids and keep everything else
    Merge,
}

impl ImportPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPolicy::Restore => "restore",
            ImportPolicy::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub count: usize,
    pub policy: ImportPolicy,
}

/// Parse a catalog document.
///
/// Records without an `order` receive their array index.
pub fn parse_catalog(json: &str) -> std::result::Result<Vec<Collection>, CatalogParseError> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        if e.is_eof() {
            CatalogParseError::Truncated(e.to_string())
        } else {
            CatalogParseError::Malformed(e.to_string())
        }
    })?;

    let Value::Array(records) = value else {
        return Err(CatalogParseError::NotAnArray);
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, mut record)| {
            if let Some(fields) = record.as_object_mut() {
                let missing = fields.get("order").map_or(true, Value::is_null);
                if missing {
                    fields.insert("order".to_string(), Value::from(index as i64));
                }
            }
            serde_json::from_value::<Collection>(record).map_err(|e| {
                CatalogParseError::InvalidRecord {
                    index,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

/// Compact JSON used for the remote backup.
pub fn serialize_catalog(collections: &[Collection]) -> Result<String> {
    Ok(serde_json::to_string(collections)?)
}

/// Pretty-printed JSON for export files.
pub fn export_catalog(collections: &[Collection]) -> Result<String> {
    Ok(serde_json::to_string_pretty(collections)?)
}

/// Export everything currently in the store.
pub async fn export_store(store: &dyn CollectionStore) -> Result<String> {
    let collections = store.get_all().await?;
    export_catalog(&collections)
}

/// Parse `json` and apply it to `store` under `policy`.
///
/// Nothing is written if the document fails to parse.
pub async fn import_catalog(
    store: &dyn CollectionStore,
    json: &str,
    policy: ImportPolicy,
) -> Result<ImportSummary> {
    let collections = parse_catalog(json)?;
    apply_catalog(store, &collections, policy).await
}

/// Apply already-parsed collections to `store` under `policy`.
pub async fn apply_catalog(
    store: &dyn CollectionStore,
    collections: &[Collection],
    policy: ImportPolicy,
) -> Result<ImportSummary> {
    match policy {
        ImportPolicy::Restore => store.replace_all(collections).await?,
        ImportPolicy::Merge => store.put_many(collections).await?,
    }

    info!(count = collections.len(), policy = policy.as_str(), "Imported catalog");
    Ok(ImportSummary {
        count: collections.len(),
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::error::LibraryError;
    use crate::models::CollectionDraft;
    use crate::store::SqliteCollectionStore;
    use chrono::{TimeZone, Utc};

    fn collection(id: &str, order: i64) -> Collection {
        let mut collection = CollectionDraft {
            item_count: 2,
            ..CollectionDraft::new(format!("Collection {id}"))
        }
        .into_collection(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        collection.id = id.to_string();
        collection.order = Some(order);
        collection
    }

    async fn store_with(collections: &[Collection]) -> SqliteCollectionStore {
        let store = SqliteCollectionStore::new(create_test_pool().await.unwrap());
        store.put_many(collections).await.unwrap();
        store
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert_eq!(
            parse_catalog(r#"{"id":"a"}"#).unwrap_err(),
            CatalogParseError::NotAnArray
        );
    }

    #[test]
    fn test_parse_classifies_truncation() {
        let err = parse_catalog(r#"[{"id":"a","createdAt":"2024-01"#).unwrap_err();
        assert!(matches!(err, CatalogParseError::Truncated(_)));

        let err = parse_catalog(r#"[{"id": nope}]"#).unwrap_err();
        assert!(matches!(err, CatalogParseError::Malformed(_)));
    }

    #[test]
    fn test_parse_fills_missing_order_with_index() {
        let json = r#"[
            {"id":"a","createdAt":"2024-01-01T00:00:00Z","order":5},
            {"id":"b","createdAt":"2024-01-01T00:00:00Z"},
            {"id":"c","createdAt":"2024-01-01T00:00:00Z","order":null}
        ]"#;
        let collections = parse_catalog(json).unwrap();

        assert_eq!(collections[0].order, Some(5));
        assert_eq!(collections[1].order, Some(1));
        assert_eq!(collections[2].order, Some(2));
    }

    #[test]
    fn test_parse_reports_invalid_record_index() {
        let json = r#"[{"id":"a","createdAt":"2024-01-01T00:00:00Z"},{"id":"b"}]"#;
        let err = parse_catalog(json).unwrap_err();
        assert!(matches!(err, CatalogParseError::InvalidRecord { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let mut original = vec![collection("a", 0), collection("b", 1), collection("c", 2)];
        original[1].items[0].image_url = Some("data:image/jpeg;base64,/9j/AA==".to_string());
        let source = store_with(&original).await;

        let exported = export_store(&source).await.unwrap();

        let target = store_with(&[]).await;
        let summary = import_catalog(&target, &exported, ImportPolicy::Restore)
            .await
            .unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(target.get_all().await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_restore_replaces_unrelated_collections() {
        let store = store_with(&[collection("x", 0), collection("y", 1), collection("z", 2)]).await;
        let incoming: Vec<_> = (0..5).map(|i| collection(&format!("n{i}"), i)).collect();
        let json = serialize_catalog(&incoming).unwrap();

        import_catalog(&store, &json, ImportPolicy::Restore)
            .await
            .unwrap();

        let stored = store.get_all().await.unwrap();
        assert_eq!(stored.len(), 5);
        assert!(stored.iter().all(|c| c.id.starts_with('n')));
    }

    #[tokio::test]
    async fn test_merge_keeps_unrelated_collections() {
        let store = store_with(&[collection("x", 0), collection("y", 1)]).await;
        let mut updated = collection("y", 1);
        updated.title_primary = "Updated".to_string();
        let json = serialize_catalog(&[updated, collection("w", 2)]).unwrap();

        let summary = import_catalog(&store, &json, ImportPolicy::Merge).await.unwrap();

        assert_eq!(summary.policy, ImportPolicy::Merge);
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.get("y").await.unwrap().unwrap().title_primary, "Updated");
    }

    #[tokio::test]
    async fn test_invalid_import_writes_nothing() {
        let store = store_with(&[collection("x", 0)]).await;

        let result = import_catalog(&store, "[{", ImportPolicy::Restore).await;
        assert!(matches!(
            result,
            Err(LibraryError::Parse(CatalogParseError::Truncated(_)))
        ));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
