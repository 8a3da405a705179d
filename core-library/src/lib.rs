//! # Local Library Store
//!
//! Owns the local library database that the reconciliation core converges
//! towards the remote service.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite schema and migrations for songs, albums, artists, playlists and their link rows
//! - Connection pooling (`db`)
//! - The [`LibraryStore`] / [`LibraryTransaction`] traits the sync core programs against
//! - Their SQLite implementation ([`SqliteLibraryStore`])

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    now_timestamp, Album, AlbumArtistMap, Artist, BookmarkKind, Playlist, PlaylistSongMap, Song,
    SongAlbumMap, SongArtistMap,
};
pub use repositories::{SqliteLibraryStore, SqliteLibraryTransaction};
pub use store::{LibraryStore, LibraryTransaction};
