//! Domain models for the image catalog
//!
//! A [`Collection`] is one catalog entry holding an ordered sequence of
//! [`Item`] slots, each optionally carrying an embedded image. The JSON shape
//! (camelCase fields) is shared by local persistence, export files and the
//! remote backup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{LibraryError, Result};

/// Lifecycle stage of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    #[default]
    Ideation,
    InProgress,
    Archived,
}

/// Whether a collection is part of a series or stands alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionKind {
    Series,
    #[default]
    Standalone,
}

/// One named slot inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique within the owning collection
    pub id: String,
    /// Position at creation time; never changes afterwards
    pub original_order: i64,
    #[serde(default)]
    pub name: String,
    /// Self-describing `data:` URL, absent until an image is attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Item {
    pub fn new(original_order: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_order,
            name: String::new(),
            image_url: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// Top-level catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    /// Listing position. Absent only on records written before ordering existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub title_primary: String,
    #[serde(default)]
    pub title_secondary: String,
    #[serde(default)]
    pub description_primary: String,
    #[serde(default)]
    pub description_secondary: String,
    #[serde(default)]
    pub reference_url: String,
    #[serde(default)]
    pub status: CollectionStatus,
    #[serde(default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Collection {
    /// Validate before persistence
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Collection id cannot be empty".to_string());
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if item.id.trim().is_empty() {
                return Err(format!("Collection {} has an item with an empty id", self.id));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(format!(
                    "Collection {} has duplicate item id {}",
                    self.id, item.id
                ));
            }
        }

        Ok(())
    }

    /// Truncate or pad the item sequence so that `items.len() == count`.
    ///
    /// Padded items get `original_order` equal to their index.
    pub fn set_item_count(&mut self, count: usize) {
        if self.items.len() > count {
            self.items.truncate(count);
        } else {
            let start = self.items.len();
            self.items
                .extend((start..count).map(|index| Item::new(index as i64)));
        }
        self.item_count = count;
    }

    /// Store an encoded image on one item.
    pub fn attach_image(&mut self, item_id: &str, data_url: impl Into<String>) -> Result<()> {
        let item = self.item_mut(item_id)?;
        item.image_url = Some(data_url.into());
        Ok(())
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Result<&mut Item> {
        let collection_id = &self.id;
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: format!("Item in collection {}", collection_id),
                id: item_id.to_string(),
            })
    }

    pub fn image_count(&self) -> usize {
        self.items.iter().filter(|item| item.has_image()).count()
    }
}

/// User-supplied fields for a new collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDraft {
    pub title_primary: String,
    #[serde(default)]
    pub title_secondary: String,
    #[serde(default)]
    pub description_primary: String,
    #[serde(default)]
    pub description_secondary: String,
    #[serde(default)]
    pub reference_url: String,
    #[serde(default)]
    pub status: CollectionStatus,
    #[serde(default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub item_count: usize,
}

impl CollectionDraft {
    pub fn new(title_primary: impl Into<String>) -> Self {
        Self {
            title_primary: title_primary.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.title_primary.trim().is_empty() {
            return Err("Collection title cannot be empty".to_string());
        }
        Ok(())
    }

    /// Materialize with a fresh id and the insert-at-top sentinel order of `-1`.
    pub fn into_collection(self, created_at: DateTime<Utc>) -> Collection {
        let mut collection = Collection {
            id: Uuid::new_v4().to_string(),
            order: Some(-1),
            title_primary: self.title_primary,
            title_secondary: self.title_secondary,
            description_primary: self.description_primary,
            description_secondary: self.description_secondary,
            reference_url: self.reference_url,
            status: self.status,
            kind: self.kind,
            item_count: 0,
            created_at,
            items: Vec::new(),
        };
        collection.set_item_count(self.item_count);
        collection
    }
}
