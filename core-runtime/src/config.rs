//! Startup settings for the sync core.
//!
//! Hosts assemble a [`CoreConfig`] through its builder; anything
//! inconsistent is rejected by `build()`, before a database is opened.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/music/library.db")
//!     .max_concurrent_upserts(16)
//!     .auto_download_liked(true)
//!     .build()?;
//! ```
//!
//! There is no default database location:
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! assert!(CoreConfig::builder().build().is_err());
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use std::path::PathBuf;

/// Upper bound for per-flow upsert concurrency.
pub const MAX_CONCURRENT_UPSERTS: usize = 256;

/// Default number of per-item upserts allowed in flight for one flow.
pub const DEFAULT_CONCURRENT_UPSERTS: usize = 8;

/// Validated startup settings, see [`CoreConfig::builder`]
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Path to the SQLite library database, or `:memory:`
    pub database_path: PathBuf,

    /// Capacity of the sync event channel
    pub event_buffer_size: usize,

    /// Maximum concurrent per-item upserts inside one flow
    pub max_concurrent_upserts: usize,

    /// Logging setup applied by the host at startup
    pub logging: LoggingConfig,

    /// Feature flags
    pub features: FeatureFlags,
}

/// Optional behaviors, all off by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Hand newly liked, not yet downloaded songs to the downloader after
    /// a liked-songs sync
    pub auto_download_liked: bool,

    /// Publish sync lifecycle events on the event bus
    pub emit_events: bool,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Whether the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    /// Rejects an empty database path, a zero event buffer and upsert
    /// concurrency outside `1..=MAX_CONCURRENT_UPSERTS`.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("database_path is empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_upserts == 0 || self.max_concurrent_upserts > MAX_CONCURRENT_UPSERTS
        {
            return Err(Error::Config(format!(
                "Concurrent upserts must be between 1 and {}, got {}",
                MAX_CONCURRENT_UPSERTS, self.max_concurrent_upserts
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    max_concurrent_upserts: Option<usize>,
    logging: Option<LoggingConfig>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// SQLite file holding the local library
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Uses an in-memory database (tests, ephemeral hosts).
    pub fn in_memory(mut self) -> Self {
        self.database_path = Some(PathBuf::from(":memory:"));
        self
    }

    /// Sets the event channel capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets how many per-item upserts one flow may run at the same time.
    pub fn max_concurrent_upserts(mut self, limit: usize) -> Self {
        self.max_concurrent_upserts = Some(limit);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Enables or disables auto-download of liked songs.
    pub fn auto_download_liked(mut self, enabled: bool) -> Self {
        self.features.auto_download_liked = enabled;
        self
    }

    /// Enables or disables sync event publication.
    pub fn emit_events(mut self, enabled: bool) -> Self {
        self.features.emit_events = enabled;
        self
    }

    /// Replace every feature flag
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Validate and finish
    ///
    /// # Errors
    ///
    /// Returns an error if the database path is missing or any value fails
    /// [`CoreConfig::validate`].
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("no library database: call database_path() or in_memory()".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            max_concurrent_upserts: self
                .max_concurrent_upserts
                .unwrap_or(DEFAULT_CONCURRENT_UPSERTS),
            logging: self.logging.unwrap_or_default(),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
