//! # Sync Module
//!
//! Mirrors the whole catalog to a single remote blob.
//!
//! ## Overview
//!
//! - [`SyncService`] handles sign-in, upload, download and session restore
//! - [`payload`] holds the checks applied to outgoing and incoming documents
//! - [`SyncError`] classifies failures for the UI (auth, size, parse, shape)
//!
//! The remote side is any [`bridge_traits::storage::RemoteBlobStore`].

pub mod error;
pub mod payload;
pub mod service;

pub use error::{ParseFailureKind, Result, SyncError};
pub use service::{DownloadReport, SyncService, SyncStatus, UploadReport, BACKUP_DESCRIPTION, BACKUP_FILE_NAME};
