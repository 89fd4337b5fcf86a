//! # Core Configuration Module
//!
//! Provides configuration management for the catalog core.
//!
//! ## Overview
//!
//! The configuration system uses a builder to construct a [`CatalogConfig`]
//! holding every bridge and tunable the core needs. Validation is fail-fast:
//! a missing capability or an out-of-range value is reported by
//! [`CatalogConfigBuilder::build`], never later at first use.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - credential persistence for the remote backup
//! - `SettingsStore` - cached remote backup id
//! - `ConfirmationPrompt` - gate for destructive restores and imports
//!
//! ## Optional Dependencies
//!
//! - `HttpClient` - remote backup transport; without it sync is disabled
//! - `Clock` - defaults to the system clock
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for the
//! required bridges and the HTTP client are injected when not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CatalogConfig;
//!
//! let config = CatalogConfig::builder()
//!     .database_path("/path/to/catalog.db")
//!     .max_image_width(1024)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    Clock, ConfirmationPrompt, HttpClient, SecureStore, SettingsStore, SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default REST endpoint of the remote backup provider.
pub const DEFAULT_REMOTE_API_BASE: &str = "https://api.github.com";

const MIB: u64 = 1024 * 1024;

/// Payload size thresholds for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLimits {
    /// Uploads above this size are rejected before any network call.
    pub hard_limit_bytes: u64,
    /// Uploads above this size succeed with a warning.
    pub soft_limit_bytes: u64,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            hard_limit_bytes: 10 * MIB,
            soft_limit_bytes: 5 * MIB,
        }
    }
}

impl SyncLimits {
    pub fn validate(&self) -> Result<()> {
        if self.hard_limit_bytes == 0 {
            return Err(Error::Config("Hard sync limit must be greater than 0".to_string()));
        }
        if self.soft_limit_bytes > self.hard_limit_bytes {
            return Err(Error::Config(format!(
                "Soft sync limit ({} bytes) exceeds hard limit ({} bytes)",
                self.soft_limit_bytes, self.hard_limit_bytes
            )));
        }
        Ok(())
    }
}

/// Image codec tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecSettings {
    /// Images wider than this are scaled down to it.
    pub max_width: u32,
    /// Lossy quality factor in `(0, 1]`.
    pub quality: f32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            max_width: 800,
            quality: 0.85,
        }
    }
}

impl CodecSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(Error::Config("Maximum image width must be greater than 0".to_string()));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::Config(format!(
                "Image quality must be within (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Core configuration for the catalog.
///
/// Use [`CatalogConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Path to the SQLite catalog database
    pub database_path: PathBuf,

    /// Base URL of the remote backup REST API
    pub remote_api_base: String,

    pub sync_limits: SyncLimits,

    pub codec: CodecSettings,

    /// Broadcast buffer for the event bus
    pub event_buffer_size: usize,

    /// HTTP transport for the remote backup (sync disabled when absent)
    pub http_client: Option<Arc<dyn HttpClient>>,

    pub secure_store: Arc<dyn SecureStore>,

    pub settings_store: Arc<dyn SettingsStore>,

    pub confirmation_prompt: Arc<dyn ConfirmationPrompt>,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("database_path", &self.database_path)
            .field("remote_api_base", &self.remote_api_base)
            .field("sync_limits", &self.sync_limits)
            .field("codec", &self.codec)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("confirmation_prompt", &"ConfirmationPrompt { ... }")
            .finish()
    }
}

impl CatalogConfig {
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Database path is not empty
    /// - Remote API base is an http(s) URL
    /// - Sync limits and codec settings are in range
    /// - Event buffer is non-empty
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if !(self.remote_api_base.starts_with("https://")
            || self.remote_api_base.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "Remote API base must be an http(s) URL, got '{}'",
                self.remote_api_base
            )));
        }

        self.sync_limits.validate()?;
        self.codec.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config("Event buffer size must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Returns the HTTP client or a capability error naming what to inject.
    pub fn require_http_client(&self) -> Result<Arc<dyn HttpClient>> {
        self.http_client.clone().ok_or_else(|| {
            Error::capability_missing(
                "HttpClient",
                "Remote backup requires an HttpClient. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Otherwise inject an implementation with .http_client().",
            )
        })
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    pub fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Err(Error::capability_missing(
            "SecureStore",
            "SecureStore implementation is required for credential persistence. \
             Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore.",
        ))
    }

    pub fn settings_store(_database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
        Err(Error::capability_missing(
            "SettingsStore",
            "SettingsStore implementation is required to remember the remote backup id. \
             Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore.",
        ))
    }

    pub fn confirmation_prompt() -> Result<Arc<dyn ConfirmationPrompt>> {
        Err(Error::capability_missing(
            "ConfirmationPrompt",
            "ConfirmationPrompt implementation is required before destructive restores. \
             Desktop: enable the 'desktop-shims' feature to use AutoConfirm.",
        ))
    }

    pub fn http_client() -> Option<Arc<dyn HttpClient>> {
        None
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{AutoConfirm, KeyringSecureStore, ReqwestHttpClient, SqliteSettingsStore};
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    pub fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Ok(Arc::new(KeyringSecureStore::new()))
    }

    /// Opens `settings.db` next to the catalog database.
    pub fn settings_store(database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
        let candidate = database_path
            .parent()
            .map(|parent| parent.join("settings.db"))
            .unwrap_or_else(|| PathBuf::from("settings.db"));

        let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
            let runtime = Runtime::new().map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

            runtime
                .block_on(SqliteSettingsStore::new(path))
                .map_err(|e| Error::Internal(format!("Failed to initialize default SettingsStore: {}", e)))
        };

        // block_on panics inside a runtime, so build on a helper thread there.
        let store = match Handle::try_current() {
            Ok(_) => thread::spawn(move || init_store(candidate))
                .join()
                .map_err(|_| {
                    Error::Internal(
                        "Worker thread panicked while creating default SettingsStore".to_string(),
                    )
                })??,
            Err(_) => init_store(candidate)?,
        };

        Ok(Arc::new(store))
    }

    pub fn confirmation_prompt() -> Result<Arc<dyn ConfirmationPrompt>> {
        // Declining keeps local data: restores become merges, remote pulls are skipped.
        Ok(Arc::new(AutoConfirm::decline()))
    }

    pub fn http_client() -> Option<Arc<dyn HttpClient>> {
        match ReqwestHttpClient::new() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Default HTTP client unavailable; remote backup disabled");
                None
            }
        }
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Default)]
pub struct CatalogConfigBuilder {
    database_path: Option<PathBuf>,
    remote_api_base: Option<String>,
    sync_limits: Option<SyncLimits>,
    codec: Option<CodecSettings>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    confirmation_prompt: Option<Arc<dyn ConfirmationPrompt>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CatalogConfigBuilder {
    /// Sets the SQLite database path. Use `":memory:"` for a throwaway catalog.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn remote_api_base(mut self, base: impl Into<String>) -> Self {
        self.remote_api_base = Some(base.into());
        self
    }

    pub fn sync_limits(mut self, limits: SyncLimits) -> Self {
        self.sync_limits = Some(limits);
        self
    }

    pub fn codec(mut self, codec: CodecSettings) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn max_image_width(mut self, max_width: u32) -> Self {
        self.codec.get_or_insert_with(CodecSettings::default).max_width = max_width;
        self
    }

    pub fn image_quality(mut self, quality: f32) -> Self {
        self.codec.get_or_insert_with(CodecSettings::default).quality = quality;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn confirmation_prompt(mut self, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        self.confirmation_prompt = Some(prompt);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds and validates the final [`CatalogConfig`].
    ///
    /// Fails with [`Error::Config`] for missing or invalid values and
    /// [`Error::CapabilityMissing`] for bridges that have no default.
    pub fn build(self) -> Result<CatalogConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => defaults::secure_store()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => defaults::settings_store(&database_path)?,
        };

        let confirmation_prompt = match self.confirmation_prompt {
            Some(prompt) => prompt,
            None => defaults::confirmation_prompt()?,
        };

        let config = CatalogConfig {
            database_path,
            remote_api_base: self
                .remote_api_base
                .unwrap_or_else(|| DEFAULT_REMOTE_API_BASE.to_string()),
            sync_limits: self.sync_limits.unwrap_or_default(),
            codec: self.codec.unwrap_or_default(),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client: self.http_client.or_else(defaults::http_client),
            secure_store,
            settings_store,
            confirmation_prompt,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
