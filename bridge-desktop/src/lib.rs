//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` using the `keyring` crate
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `ConfirmationPrompt` answering with a fixed value
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let settings = SqliteSettingsStore::new(bridge_desktop::default_data_dir().join("settings.db")).await?;
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;
mod prompt;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

use std::path::PathBuf;

pub use http::ReqwestHttpClient;
pub use prompt::AutoConfirm;
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;

/// Per-user data directory for the catalog, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("image-catalog"))
        .unwrap_or_else(|| PathBuf::from("."))
}
