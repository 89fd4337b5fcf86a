//! # Host Bridge Traits
//!
//! Capability traits the catalog core requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the catalog core and host-specific
//! implementations. Each trait represents a capability that the core needs but
//! that is provided differently per host.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with bearer auth, retry, TLS
//! - [`RemoteBlobStore`](storage::RemoteBlobStore) - Single-document remote backup store
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Secret Service)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### User Interaction
//! - [`ConfirmationPrompt`](prompt::ConfirmationPrompt) - Gate destructive operations
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| ConfigError::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Enable the desktop-shims feature or inject an adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep credentials out of messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared behind `Arc`
//! across async tasks.

pub mod error;
pub mod http;
pub mod prompt;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use prompt::{ConfirmationPrompt, ConfirmationRequest};
pub use storage::{RemoteBlob, RemoteBlobFile, RemoteBlobStore, SecureStore, SettingsStore};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
