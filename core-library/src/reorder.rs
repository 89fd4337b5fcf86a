//! # Manual Reordering
//!
//! Click-to-swap reordering. The first click selects a source, a second click
//! on the same key clears the selection, and a click on a different key asks
//! for a swap of the two.
//!
//! - [`CollectionReorder`] swaps the `order` values of two collections and
//!   persists the whole listing in one batch.
//! - [`ItemReorder`] swaps two items inside a collection being edited; nothing
//!   is persisted until the editor saves the collection.

use crate::error::{LibraryError, Result};
use crate::listing::{normalize_orders, sort_for_listing};
use crate::models::Collection;
use crate::store::CollectionStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Selection state for click-to-swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<K> {
    None,
    Source(K),
}

impl<K> Default for Selection<K> {
    fn default() -> Self {
        Selection::None
    }
}

/// What a click did to the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome<K> {
    Selected(K),
    Deselected,
    /// Swap `(source, target)`; the selection has already been cleared.
    Swap(K, K),
}

impl<K: PartialEq + Clone> Selection<K> {
    pub fn click(&mut self, key: K) -> ClickOutcome<K> {
        match std::mem::take(self) {
            Selection::None => {
                *self = Selection::Source(key.clone());
                ClickOutcome::Selected(key)
            }
            Selection::Source(source) if source == key => ClickOutcome::Deselected,
            Selection::Source(source) => ClickOutcome::Swap(source, key),
        }
    }

    pub fn source(&self) -> Option<&K> {
        match self {
            Selection::None => None,
            Selection::Source(key) => Some(key),
        }
    }

    pub fn clear(&mut self) {
        *self = Selection::None;
    }
}

fn position_of(listing: &[Collection], id: &str) -> Result<usize> {
    listing
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| LibraryError::NotFound {
            entity_type: "Collection".to_string(),
            id: id.to_string(),
        })
}

/// Listing-level reorder session
pub struct CollectionReorder {
    store: Arc<dyn CollectionStore>,
    listing: Vec<Collection>,
    selection: Selection<String>,
}

impl CollectionReorder {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self {
            store,
            listing: Vec::new(),
            selection: Selection::None,
        }
    }

    /// Reload the listing from the store and clear any selection.
    pub async fn load(&mut self) -> Result<&[Collection]> {
        self.listing = self.store.get_all().await?;
        self.selection.clear();
        Ok(&self.listing)
    }

    pub fn listing(&self) -> &[Collection] {
        &self.listing
    }

    pub fn selection(&self) -> &Selection<String> {
        &self.selection
    }

    /// Feed one click into the state machine, swapping when it completes a pair.
    pub async fn click(&mut self, id: &str) -> Result<ClickOutcome<String>> {
        let outcome = self.selection.click(id.to_string());
        if let ClickOutcome::Swap(source, target) = &outcome {
            self.swap(source, target).await?;
        }
        Ok(outcome)
    }

    /// Exchange the `order` values of two collections and persist the listing.
    ///
    /// The published listing only changes after the batch commits. Selection
    /// is cleared whether or not the swap succeeds.
    pub async fn swap(&mut self, first_id: &str, second_id: &str) -> Result<()> {
        self.selection.clear();

        let mut next = self.listing.clone();
        normalize_orders(&mut next);

        let first = position_of(&next, first_id)?;
        let second = position_of(&next, second_id)?;
        let first_order = next[first].order;
        next[first].order = next[second].order;
        next[second].order = first_order;

        sort_for_listing(&mut next);

        if let Err(e) = self.store.put_many(&next).await {
            warn!(first_id, second_id, error = %e, "Swap failed to persist; listing unchanged");
            return Err(e);
        }

        info!(first_id, second_id, "Swapped collection order");
        self.listing = next;
        Ok(())
    }
}

/// Item-level reorder session over a collection in an editor
#[derive(Debug, Clone)]
pub struct ItemReorder {
    collection: Collection,
    selection: Selection<String>,
}

impl ItemReorder {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            selection: Selection::None,
        }
    }

    pub fn click(&mut self, item_id: &str) -> Result<ClickOutcome<String>> {
        let outcome = self.selection.click(item_id.to_string());
        if let ClickOutcome::Swap(source, target) = &outcome {
            let items = &self.collection.items;
            let missing = |id: &str| LibraryError::NotFound {
                entity_type: "Item".to_string(),
                id: id.to_string(),
            };
            let first = items
                .iter()
                .position(|item| &item.id == source)
                .ok_or_else(|| missing(source))?;
            let second = items
                .iter()
                .position(|item| &item.id == target)
                .ok_or_else(|| missing(target))?;

            self.collection.items.swap(first, second);
            debug!(first, second, "Swapped items");
        }
        Ok(outcome)
    }

    pub fn selection(&self) -> &Selection<String> {
        &self.selection
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn into_inner(self) -> Collection {
        self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::CollectionDraft;
    use crate::store::SqliteCollectionStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mockall::mock;

    mock! {
        pub Store {}

        #[async_trait]
        impl CollectionStore for Store {
            async fn put_one(&self, collection: &Collection) -> Result<()>;
            async fn put_many(&self, collections: &[Collection]) -> Result<()>;
            async fn get_all(&self) -> Result<Vec<Collection>>;
            async fn get(&self, id: &str) -> Result<Option<Collection>>;
            async fn delete_one(&self, id: &str) -> Result<bool>;
            async fn clear_all(&self) -> Result<()>;
            async fn replace_all(&self, collections: &[Collection]) -> Result<()>;
            async fn count(&self) -> Result<i64>;
        }
    }

    fn collection(id: &str, order: Option<i64>) -> Collection {
        let mut collection = CollectionDraft {
            item_count: 3,
            ..CollectionDraft::new(id)
        }
        .into_collection(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        collection.id = id.to_string();
        collection.order = order;
        collection
    }

    fn ids(collections: &[Collection]) -> Vec<&str> {
        collections.iter().map(|c| c.id.as_str()).collect()
    }

    async fn seeded_store(collections: &[Collection]) -> Arc<SqliteCollectionStore> {
        let store = SqliteCollectionStore::new(create_test_pool().await.unwrap());
        store.put_many(collections).await.unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_selection_state_machine() {
        let mut selection = Selection::None;

        assert_eq!(selection.click("a"), ClickOutcome::Selected("a"));
        assert_eq!(selection.source(), Some(&"a"));

        assert_eq!(selection.click("a"), ClickOutcome::Deselected);
        assert_eq!(selection, Selection::None);

        selection.click("a");
        assert_eq!(selection.click("b"), ClickOutcome::Swap("a", "b"));
        assert_eq!(selection, Selection::None);
    }

    #[tokio::test]
    async fn test_swap_two_collections() {
        let store = seeded_store(&[collection("A", Some(0)), collection("B", Some(1))]).await;
        let mut reorder = CollectionReorder::new(store.clone());
        reorder.load().await.unwrap();

        assert_eq!(
            reorder.click("A").await.unwrap(),
            ClickOutcome::Selected("A".to_string())
        );
        assert_eq!(
            reorder.click("B").await.unwrap(),
            ClickOutcome::Swap("A".to_string(), "B".to_string())
        );

        assert_eq!(ids(reorder.listing()), vec!["B", "A"]);
        assert_eq!(reorder.selection(), &Selection::None);

        let stored = store.get_all().await.unwrap();
        assert_eq!(ids(&stored), vec!["B", "A"]);
        assert_eq!(stored[0].order, Some(0));
        assert_eq!(stored[1].order, Some(1));
    }

    #[tokio::test]
    async fn test_swap_preserves_order_multiset() {
        let store = seeded_store(&[
            collection("a", Some(0)),
            collection("b", Some(3)),
            collection("c", Some(7)),
            collection("d", Some(9)),
        ])
        .await;
        let mut reorder = CollectionReorder::new(store.clone());
        reorder.load().await.unwrap();

        reorder.swap("b", "d").await.unwrap();

        let stored = store.get_all().await.unwrap();
        let mut orders: Vec<_> = stored.iter().filter_map(|c| c.order).collect();
        orders.sort();
        assert_eq!(orders, vec![0, 3, 7, 9]);
        assert_eq!(ids(&stored), vec!["a", "d", "c", "b"]);

        // Untouched collections keep their order
        assert_eq!(stored[0].order, Some(0));
        assert_eq!(stored[2].order, Some(7));
    }

    #[tokio::test]
    async fn test_swap_normalizes_legacy_listing() {
        let store = seeded_store(&[collection("x", None), collection("y", None)]).await;
        let mut reorder = CollectionReorder::new(store.clone());
        let before: Vec<String> = reorder
            .load()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id.clone())
            .collect();

        reorder.swap(&before[0], &before[1]).await.unwrap();

        let stored = store.get_all().await.unwrap();
        assert!(stored.iter().all(|c| c.order.is_some()));
        assert_eq!(stored[0].id, before[1]);
        assert_eq!(stored[1].id, before[0]);
    }

    #[tokio::test]
    async fn test_swap_in_mixed_listing_matches_clicks() {
        let mut newest = collection("A", None);
        newest.created_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let store = seeded_store(&[newest, collection("B", Some(0)), collection("C", Some(1))]).await;
        let mut reorder = CollectionReorder::new(store.clone());
        reorder.load().await.unwrap();
        assert_eq!(ids(reorder.listing()), vec!["A", "B", "C"]);

        reorder.swap("A", "C").await.unwrap();

        assert_eq!(ids(reorder.listing()), vec!["C", "B", "A"]);
        let stored = store.get_all().await.unwrap();
        assert_eq!(ids(&stored), vec!["C", "B", "A"]);
        assert_eq!(
            stored.iter().map(|c| c.order).collect::<Vec<_>>(),
            vec![Some(0), Some(1), Some(2)]
        );
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_listing() {
        let listing = vec![collection("A", Some(0)), collection("B", Some(1))];
        let mut store = MockStore::new();
        let loaded = listing.clone();
        store
            .expect_get_all()
            .returning(move || Ok(loaded.clone()));
        store
            .expect_put_many()
            .times(1)
            .returning(|_| Err(LibraryError::Storage(sqlx::Error::PoolClosed)));

        let mut reorder = CollectionReorder::new(Arc::new(store));
        reorder.load().await.unwrap();

        reorder.click("A").await.unwrap();
        let result = reorder.click("B").await;

        assert!(matches!(result, Err(LibraryError::Storage(_))));
        assert_eq!(reorder.listing(), listing.as_slice());
        assert_eq!(reorder.selection(), &Selection::None);
    }

    #[tokio::test]
    async fn test_swap_unknown_collection() {
        let store = seeded_store(&[collection("A", Some(0))]).await;
        let mut reorder = CollectionReorder::new(store);
        reorder.load().await.unwrap();

        let result = reorder.swap("A", "ghost").await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
        assert_eq!(ids(reorder.listing()), vec!["A"]);
    }

    #[test]
    fn test_item_reorder_swaps_indices() {
        let original = collection("c", Some(0));
        let first = original.items[0].id.clone();
        let third = original.items[2].id.clone();
        let mut editor = ItemReorder::new(original);

        editor.click(&first).unwrap();
        let outcome = editor.click(&third).unwrap();
        assert_eq!(outcome, ClickOutcome::Swap(first.clone(), third.clone()));

        let items = &editor.collection().items;
        assert_eq!(items[0].id, third);
        assert_eq!(items[2].id, first);
        // original_order is not touched by reordering
        assert_eq!(items[0].original_order, 2);

        let saved = editor.into_inner();
        assert_eq!(saved.items.len(), 3);
    }

    #[test]
    fn test_item_reorder_deselect() {
        let original = collection("c", Some(0));
        let first = original.items[0].id.clone();
        let mut editor = ItemReorder::new(original.clone());

        editor.click(&first).unwrap();
        assert_eq!(editor.click(&first).unwrap(), ClickOutcome::Deselected);
        assert_eq!(editor.collection(), &original);
    }
}
