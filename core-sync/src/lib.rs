//! # Library Reconciliation
//!
//! Converges the local library onto the user's collections on the remote
//! music service.
//!
//! ## Overview
//!
//! Five independent flows keep local bookmarks in step with the remote
//! side: liked songs, library songs, liked albums, artist subscriptions and
//! saved playlists (including their contents). Each flow:
//! - Fetches the remote snapshot, aborting with no local write on failure
//! - Clears the bookmark of local rows that disappeared remotely
//! - Inserts or bookmarks every remote item in its own transaction, with
//!   bounded concurrency and per-item failure isolation
//!
//! ## Components
//!
//! - **Remote reader** (`remote`): the `RemoteLibrary` trait and remote item model
//! - **Guards** (`guard`): one non-blocking running flag per flow
//! - **Reconciler** (`reconciler`): the generic diff shared by every flow
//! - **Flows** (`flows`, `playlist`): per-flow adapters and playlist content replacement
//! - **Service** (`coordinator`): `LibrarySyncService`, the public entry points

pub mod config;
pub mod coordinator;
pub mod error;
mod flows;
pub mod guard;
mod playlist;
mod reconciler;
pub mod remote;

pub use config::{CollectionSource, SyncConfig, LIKED_SONGS_PLAYLIST_ID, SAVED_EPISODES_PLAYLIST_ID};
pub use coordinator::{AutoDownloader, FlowOutcome, LibrarySyncService, SyncAllReport};
pub use error::{RemoteError, Result, SyncError};
pub use guard::{FlowGuards, FlowPermit, SyncFlow};
pub use reconciler::{ItemFailure, ReconcileReport};
pub use remote::{
    RemoteAlbum, RemoteAlbumPage, RemoteAlbumRef, RemoteArtist, RemoteArtistRef, RemoteItem,
    RemoteItemKind, RemoteLibrary, RemotePlaylist, RemotePlaylistPage, RemoteSong,
};
