//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, secure
//! storage, settings, confirmation prompt, clock) into the catalog core.
//! Desktop apps typically enable the `desktop-shims` feature, which lets
//! [`CatalogConfig::builder`](core_runtime::config::CatalogConfig::builder)
//! fill in the `bridge-desktop` defaults.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CatalogConfig;
//! use core_service::CatalogService;
//! use core_library::CollectionDraft;
//!
//! let config = CatalogConfig::builder()
//!     .database_path("/var/lib/catalog/catalog.db")
//!     .build()?;
//! let catalog = CatalogService::new(config).await?;
//!
//! catalog.create_collection(CollectionDraft::new("Sketchbook")).await?;
//! let json = catalog.export_catalog().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{CatalogService, CompressionReport, PullOutcome};
pub use error::{CoreError, Result};
