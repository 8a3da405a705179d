//! Library sync façade.
//!
//! Wires the workspace crates together for a host application: runtime
//! configuration in, a ready [`LibrarySyncService`] out. Hosts that need a
//! different store or event wiring can use `core-sync` directly.

use core_library::{create_pool, DatabaseConfig, LibraryError, SqliteLibraryStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use std::sync::Arc;
use tracing::info;

pub use core_library;
pub use core_runtime;
pub use core_sync;
pub use core_sync::{LibrarySyncService, RemoteLibrary, SyncConfig, SyncError, SyncFlow};

#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Everything [`bootstrap`] created
pub struct LibrarySync {
    pub service: LibrarySyncService,
    pub store: Arc<SqliteLibraryStore>,
    /// Present when `emit_events` is enabled
    pub events: Option<Arc<EventBus>>,
}

/// Open the library database and build the sync service for `remote`
///
/// Logging is left to the host; call
/// [`core_runtime::logging::init_logging`] with `config.logging` first if
/// nothing else installs a subscriber.
pub async fn bootstrap(config: &CoreConfig, remote: Arc<dyn RemoteLibrary>) -> Result<LibrarySync> {
    config.validate()?;

    let db_config = if config.is_in_memory() {
        DatabaseConfig::in_memory()
    } else {
        DatabaseConfig::new(config.database_path.clone())
    };
    let pool = create_pool(db_config).await?;
    let store = Arc::new(SqliteLibraryStore::new(pool));

    let events = config
        .features
        .emit_events
        .then(|| Arc::new(EventBus::new(config.event_buffer_size)));

    let service = LibrarySyncService::new(
        SyncConfig::from(config),
        remote,
        store.clone(),
        events.clone(),
    )?;

    info!(
        database = %config.database_path.display(),
        events = events.is_some(),
        "Library sync ready"
    );

    Ok(LibrarySync {
        service,
        store,
        events,
    })
}
