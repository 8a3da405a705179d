//! Opening the library database.
//!
//! The pool runs in WAL mode with foreign keys on, and every pool handed
//! out has the schema in `migrations/` applied. Sync flows run side by side,
//! so writers wait on `busy_timeout` for the lock rather than failing fast.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("library.db")).await?;
//! ```
//!
//! An in-memory database lives inside a single SQLite connection, which is
//! why [`DatabaseConfig::in_memory`] caps the pool at one connection and
//! why store callers finish their reads before opening a transaction.

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const MEMORY_URL: &str = "sqlite::memory:";

/// Pool settings for the library database
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long a flow waits for a free connection
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database
    pub busy_timeout: Duration,
    /// Connections idle for longer are closed; `None` keeps them forever
    pub idle_timeout: Option<Duration>,
    /// Connections older than this are replaced; `None` keeps them forever
    pub max_lifetime: Option<Duration>,
}

impl DatabaseConfig {
    /// Library database stored at `database_path`, created on first open
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: format!("sqlite:{}", database_path.into().display()),
            max_connections: 5,
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            ..Self::in_memory()
        }
    }

    /// Throwaway library database held by a single pinned connection
    pub fn in_memory() -> Self {
        Self {
            database_url: MEMORY_URL.to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(10),
            idle_timeout: None,
            max_lifetime: None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.ends_with(":memory:")
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(LibraryError::invalid(
                "max_connections",
                "must be greater than 0",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(LibraryError::invalid(
                "min_connections",
                format!(
                    "{} exceeds max_connections {}",
                    self.min_connections, self.max_connections
                ),
            ));
        }

        // A second connection would see its own, empty database.
        if self.is_in_memory() && self.max_connections != 1 {
            return Err(LibraryError::invalid(
                "max_connections",
                "an in-memory database must use exactly one connection",
            ));
        }

        // Retiring the only connection drops the database with it.
        if self.is_in_memory() && (self.max_lifetime.is_some() || self.idle_timeout.is_some()) {
            return Err(LibraryError::invalid(
                "max_lifetime",
                "an in-memory connection must never be recycled",
            ));
        }

        Ok(())
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .map_err(LibraryError::Database)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true)
            .busy_timeout(self.busy_timeout);
        Ok(options)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the library database and bring its schema up to date
///
/// Fails with [`LibraryError::InvalidInput`] for inconsistent settings,
/// [`LibraryError::Database`] when SQLite cannot be opened or does not
/// answer, and [`LibraryError::Migration`] when the schema cannot be applied.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    config.validate()?;
    let options = config.connect_options()?;

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect_with(options)
        .await
        .map_err(|e| {
            warn!(database_url = %config.database_url, error = %e, "Cannot open library database");
            LibraryError::Database(e)
        })?;

    apply_schema(&pool).await?;
    ping(&pool).await?;

    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Library database open"
    );
    Ok(pool)
}

/// In-memory library with the schema applied
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn apply_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Library schema migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    debug!("Library schema up to date");
    Ok(())
}

async fn ping(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(LibraryError::Database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_answers() {
        let pool = create_test_pool().await.unwrap();
        assert!(ping(&pool).await.is_ok());
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_file_config_defaults() {
        let config = DatabaseConfig::new("library.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(3));

        assert_eq!(config.database_url, "sqlite:library.db");
        assert!(!config.is_in_memory());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(3));
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert!(config.idle_timeout.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_in_memory_config_is_single_connection() {
        let config = DatabaseConfig::default();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(config.validate().is_ok());

        let widened = DatabaseConfig::in_memory().max_connections(4);
        assert!(matches!(
            widened.validate(),
            Err(LibraryError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_in_memory_connection_is_never_recycled() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.max_lifetime, None);
        assert_eq!(config.idle_timeout, None);

        let aging = DatabaseConfig {
            max_lifetime: Some(Duration::from_secs(1800)),
            ..DatabaseConfig::in_memory()
        };
        assert!(matches!(
            aging.validate(),
            Err(LibraryError::InvalidInput { .. })
        ));

        let file = DatabaseConfig::new("library.db");
        assert_eq!(file.max_lifetime, Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_inconsistent_connection_counts_rejected() {
        let inverted = DatabaseConfig::new("library.db")
            .min_connections(6)
            .max_connections(5);
        assert!(inverted.validate().is_err());

        let empty = DatabaseConfig::new("library.db")
            .min_connections(0)
            .max_connections(0);
        assert!(empty.validate().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_writers_share_one_database() {
        let pool = create_test_pool().await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    sqlx::query(
                        "INSERT INTO artists (id, name, created_at, updated_at) VALUES (?, ?, 0, 0)",
                    )
                    .bind(format!("UC{i}"))
                    .bind(format!("Artist {i}"))
                    .execute(&pool)
                    .await
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM artists")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_orphan_link_rejected() {
        let pool = create_test_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO song_artist_map (song_id, artist_id, position) VALUES ('missing', 'UC0', 0)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "links must reference existing rows");
    }

    #[tokio::test]
    async fn test_schema_has_library_tables() {
        let pool = create_test_pool().await.unwrap();

        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<String> = names.into_iter().map(|(name,)| name).collect();

        for table in [
            "songs",
            "artists",
            "albums",
            "playlists",
            "song_artist_map",
            "song_album_map",
            "album_artist_map",
            "playlist_song_map",
        ] {
            assert!(names.iter().any(|n| n == table), "missing table {table}");
        }
    }
}
