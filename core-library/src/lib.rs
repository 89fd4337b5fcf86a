//! # Catalog Store
//!
//! Local-first persistence for the image catalog.
//!
//! ## Overview
//!
//! This crate manages:
//! - The SQLite schema, migrations and connection pool
//! - The [`CollectionStore`] repository with atomic batch writes
//! - Listing order and insert-at-top creation
//! - Click-to-swap reordering of collections and items
//! - JSON export and import of the whole catalog

pub mod db;
pub mod error;
pub mod listing;
pub mod models;
pub mod reorder;
pub mod store;
pub mod transfer;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CatalogParseError, LibraryError, Result};
pub use listing::{insert_at_top, sort_for_listing};
pub use models::{Collection, CollectionDraft, CollectionKind, CollectionStatus, Item};
pub use reorder::{ClickOutcome, CollectionReorder, ItemReorder, Selection};
pub use store::{CollectionStore, SqliteCollectionStore};
pub use transfer::{
    apply_catalog, export_catalog, export_store, import_catalog, parse_catalog,
    serialize_catalog, ImportPolicy, ImportSummary,
};
