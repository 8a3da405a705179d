use core_library::LibraryError;
use thiserror::Error;

/// Failure reported by the remote collection reader.
///
/// The core treats every variant as transient: it aborts the flow (list
/// fetch) or the single item (detail fetch) and never retries on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Remote API error {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote fetch failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Sync task failed: {0}")]
    Join(String),

    #[error("Auto-download failed: {0}")]
    Download(String),

    #[error("Invalid sync configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
