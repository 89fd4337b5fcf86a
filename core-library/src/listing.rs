//! Listing order and insert-at-top creation

use crate::error::{LibraryError, Result};
use crate::models::Collection;
use crate::store::CollectionStore;
use std::cmp::Ordering;
use tracing::info;

/// Sort collections into their display order.
///
/// When every collection carries an `order` the listing is ascending by
/// `order`. If any record predates ordering, the whole listing falls back to
/// newest-first by `created_at`. Ties break on `id` ascending in both modes.
pub fn sort_for_listing(collections: &mut [Collection]) {
    if collections.iter().all(|c| c.order.is_some()) {
        collections.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    } else {
        collections.sort_by(|a, b| by_newest(a, b).then_with(|| a.id.cmp(&b.id)));
    }
}

fn by_newest(a: &Collection, b: &Collection) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

/// Renumber a listing that is in display order when any record lacks an order.
///
/// Once one record is missing its order the listing is sorted by
/// `created_at`, so stored orders no longer describe positions. Every record
/// is renumbered to its position. A fully ordered listing is left untouched.
pub(crate) fn normalize_orders(listing: &mut [Collection]) {
    if listing.iter().all(|c| c.order.is_some()) {
        return;
    }
    for (position, collection) in listing.iter_mut().enumerate() {
        collection.order = Some(position as i64);
    }
}

/// Insert `collection` at the top of the listing.
///
/// The new record enters with the sentinel order `-1`, then every record in
/// the batch is shifted down by one so the new collection lands on `0`.
/// If any record lacks an order, every record is first renumbered to its
/// current listing position. The whole batch is written with a single `put_many`.
pub async fn insert_at_top(
    store: &dyn CollectionStore,
    mut collection: Collection,
) -> Result<Collection> {
    collection.validate().map_err(|e| LibraryError::Validation {
        field: "Collection".to_string(),
        message: e,
    })?;

    let mut batch = store.get_all().await?;
    batch.retain(|existing| existing.id != collection.id);
    normalize_orders(&mut batch);

    collection.order = Some(-1);
    batch.insert(0, collection);

    for entry in batch.iter_mut() {
        entry.order = entry.order.map(|order| order + 1);
    }

    store.put_many(&batch).await?;

    let created = batch.swap_remove(0);
    info!(collection_id = %created.id, shifted = batch.len(), "Inserted collection at top");
    Ok(created)
}
