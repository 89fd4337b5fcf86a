//! Collection store trait and SQLite implementation
//!
//! Each collection is persisted as one row keyed by id. The full JSON record
//! lives in `record`; `sort_order` and `created_at` are duplicated into their
//! own columns for indexing.

use crate::error::{LibraryError, Result};
use crate::listing::sort_for_listing;
use crate::models::Collection;
use async_trait::async_trait;
use sqlx::{query, query_as, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

/// Durable key-value persistence for catalog collections
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert or overwrite one collection by id
    ///
    /// # Errors
    /// Returns error if:
    /// - Collection validation fails
    /// - Database error occurs
    async fn put_one(&self, collection: &Collection) -> Result<()>;

    /// Insert or overwrite a batch inside one transaction
    ///
    /// Either every collection is written or none is.
    async fn put_many(&self, collections: &[Collection]) -> Result<()>;

    /// Every stored collection in listing order
    ///
    /// See [`sort_for_listing`] for the ordering rules.
    async fn get_all(&self) -> Result<Vec<Collection>>;

    /// Find a collection by its ID
    ///
    /// # Returns
    /// - `Ok(Some(collection))` if found
    /// - `Ok(None)` if not found
    async fn get(&self, id: &str) -> Result<Option<Collection>>;

    /// Delete a collection by ID
    ///
    /// # Returns
    /// - `Ok(true)` if the collection was deleted
    /// - `Ok(false)` if it was not stored
    async fn delete_one(&self, id: &str) -> Result<bool>;

    /// Remove every collection
    async fn clear_all(&self) -> Result<()>;

    /// Clear the store and write `collections` in one transaction
    ///
    /// On failure the previous contents remain untouched.
    async fn replace_all(&self, collections: &[Collection]) -> Result<()>;

    /// Count stored collections
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of CollectionStore
pub struct SqliteCollectionStore {
    pool: SqlitePool,
}

impl SqliteCollectionStore {
    /// Create a new SqliteCollectionStore
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn validate(collection: &Collection) -> Result<()> {
        collection
            .validate()
            .map_err(|e| LibraryError::Validation {
                field: "Collection".to_string(),
                message: e,
            })
    }

    async fn upsert(tx: &mut Transaction<'_, Sqlite>, collection: &Collection) -> Result<()> {
        let record = serde_json::to_string(collection)?;

        query(
            r#"
            INSERT INTO collections (id, sort_order, created_at, record)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                sort_order = excluded.sort_order,
                created_at = excluded.created_at,
                record = excluded.record
            "#,
        )
        .bind(&collection.id)
        .bind(collection.order)
        .bind(collection.created_at.to_rfc3339())
        .bind(record)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CollectionStore for SqliteCollectionStore {
    async fn put_one(&self, collection: &Collection) -> Result<()> {
        self.put_many(std::slice::from_ref(collection)).await
    }

    async fn put_many(&self, collections: &[Collection]) -> Result<()> {
        // Validate everything up front so a bad record never opens a transaction
        for collection in collections {
            Self::validate(collection)?;
        }

        let mut tx = self.pool.begin().await?;
        for collection in collections {
            Self::upsert(&mut tx, collection).await?;
        }
        tx.commit().await?;

        debug!(count = collections.len(), "Committed collection batch");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Collection>> {
        let rows = query_as::<_, (String,)>("SELECT record FROM collections")
            .fetch_all(&self.pool)
            .await?;

        let mut collections = rows
            .into_iter()
            .map(|(record,)| serde_json::from_str::<Collection>(&record))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        sort_for_listing(&mut collections);
        Ok(collections)
    }

    async fn get(&self, id: &str) -> Result<Option<Collection>> {
        let row = query_as::<_, (String,)>("SELECT record FROM collections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(record,)| serde_json::from_str(&record))
            .transpose()
            .map_err(LibraryError::from)
    }

    async fn delete_one(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_all(&self) -> Result<()> {
        let result = query("DELETE FROM collections").execute(&self.pool).await?;
        info!(removed = result.rows_affected(), "Cleared collection store");
        Ok(())
    }

    async fn replace_all(&self, collections: &[Collection]) -> Result<()> {
        for collection in collections {
            Self::validate(collection)?;
        }

        let mut tx = self.pool.begin().await?;
        query("DELETE FROM collections").execute(&mut *tx).await?;
        for collection in collections {
            Self::upsert(&mut tx, collection).await?;
        }
        tx.commit().await?;

        info!(count = collections.len(), "Replaced collection store contents");
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM collections")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::CollectionDraft;
    use chrono::{Duration, TimeZone, Utc};

    async fn setup_store() -> SqliteCollectionStore {
        let pool = create_test_pool().await.unwrap();
        SqliteCollectionStore::new(pool)
    }

    fn collection(id: &str, order: Option<i64>) -> Collection {
        let mut collection = CollectionDraft::new(format!("Title {id}"))
            .into_collection(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        collection.id = id.to_string();
        collection.order = order;
        collection
    }

    async fn install_poison_trigger(store: &SqliteCollectionStore) {
        query(
            "CREATE TRIGGER reject_poison BEFORE INSERT ON collections \
             WHEN NEW.id = 'poison' BEGIN SELECT RAISE(ABORT, 'poisoned'); END;",
        )
        .execute(store.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = setup_store().await;
        let c = collection("a", Some(0));

        store.put_one(&c).await.unwrap();

        let found = store.get("a").await.unwrap();
        assert_eq!(found, Some(c));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_one_overwrites_by_id() {
        let store = setup_store().await;
        let mut c = collection("a", Some(0));
        store.put_one(&c).await.unwrap();

        c.title_primary = "Renamed".to_string();
        store.put_one(&c).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("a").await.unwrap().unwrap().title_primary, "Renamed");
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_collection() {
        let store = setup_store().await;
        let c = collection("", Some(0));

        let result = store.put_one(&c).await;
        assert!(matches!(result, Err(LibraryError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_get_all_sorts_by_order_with_id_tiebreak() {
        let store = setup_store().await;
        store
            .put_many(&[
                collection("c", Some(1)),
                collection("b", Some(0)),
                collection("a", Some(1)),
            ])
            .await
            .unwrap();

        let ids: Vec<_> = store.get_all().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_get_all_falls_back_to_created_at_when_order_missing() {
        let store = setup_store().await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut old = collection("old", Some(0));
        old.created_at = base;
        let mut legacy = collection("legacy", None);
        legacy.created_at = base + Duration::days(1);
        let mut newest = collection("newest", Some(5));
        newest.created_at = base + Duration::days(2);

        store.put_many(&[old, legacy, newest]).await.unwrap();

        let ids: Vec<_> = store.get_all().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["newest", "legacy", "old"]);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = setup_store().await;
        store.put_one(&collection("a", Some(0))).await.unwrap();

        assert!(store.delete_one("a").await.unwrap());
        assert!(!store.delete_one("a").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = setup_store().await;
        store
            .put_many(&[collection("a", Some(0)), collection("b", Some(1))])
            .await
            .unwrap();

        store.clear_all().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_many_is_all_or_nothing() {
        let store = setup_store().await;
        store.put_one(&collection("existing", Some(9))).await.unwrap();
        install_poison_trigger(&store).await;

        let mut renamed = collection("existing", Some(0));
        renamed.title_primary = "Should not persist".to_string();
        let batch = vec![
            collection("first", Some(1)),
            renamed,
            collection("poison", Some(2)),
            collection("last", Some(3)),
        ];

        let result = store.put_many(&batch).await;
        assert!(matches!(result, Err(LibraryError::Storage(_))));

        let stored = store.get_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "existing");
        assert_eq!(stored[0].order, Some(9));
        assert_eq!(stored[0].title_primary, "Title existing");
    }

    #[tokio::test]
    async fn test_replace_all_swaps_contents() {
        let store = setup_store().await;
        store
            .put_many(&[collection("x", Some(0)), collection("y", Some(1))])
            .await
            .unwrap();

        store
            .replace_all(&[collection("a", Some(0)), collection("b", Some(1))])
            .await
            .unwrap();

        let ids: Vec<_> = store.get_all().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_replace_all_keeps_previous_catalog() {
        let store = setup_store().await;
        store
            .put_many(&[collection("x", Some(0)), collection("y", Some(1))])
            .await
            .unwrap();
        install_poison_trigger(&store).await;

        let result = store
            .replace_all(&[collection("a", Some(0)), collection("poison", Some(1))])
            .await;
        assert!(result.is_err());

        let ids: Vec<_> = store.get_all().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }
}
