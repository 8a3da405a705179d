//! Local Library Store
//!
//! The reconciliation core talks to the library only through these two
//! traits. [`LibraryStore`] answers ordered and point queries;
//! [`LibraryTransaction`] is one atomic unit of work. A transaction that is
//! dropped without [`LibraryTransaction::commit`] is rolled back.
//!
//! Writes are narrow on purpose:
//! - `insert_*` never overwrite an existing row and report whether a row was created
//! - [`LibraryTransaction::mark`] and [`LibraryTransaction::unmark`] touch a single
//!   bookmark column and only when its state actually changes
//!
//! so two flows updating different bookmarks of the same row cannot lose
//! each other's writes.

use crate::error::Result;
use crate::models::{
    Album, AlbumArtistMap, Artist, BookmarkKind, Playlist, PlaylistSongMap, Song, SongAlbumMap,
    SongArtistMap,
};
use async_trait::async_trait;

/// Read access to the library plus the entry point for transactions
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Songs liked on the remote service, ordered by title
    async fn liked_songs(&self) -> Result<Vec<Song>>;

    /// Songs saved to the remote library, ordered by title
    async fn library_songs(&self) -> Result<Vec<Song>>;

    /// Liked songs that have not been downloaded yet, ordered by title
    async fn liked_songs_not_downloaded(&self) -> Result<Vec<Song>>;

    /// Saved albums, ordered by title
    async fn liked_albums(&self) -> Result<Vec<Album>>;

    /// Subscribed artists, ordered by name
    async fn bookmarked_artists(&self) -> Result<Vec<Artist>>;

    /// Every playlist, local and remote-backed, ordered by name
    async fn playlists(&self) -> Result<Vec<Playlist>>;

    async fn song(&self, id: &str) -> Result<Option<Song>>;

    async fn album(&self, id: &str) -> Result<Option<Album>>;

    async fn artist(&self, id: &str) -> Result<Option<Artist>>;

    async fn playlist(&self, id: &str) -> Result<Option<Playlist>>;

    /// Find the playlist backed by the remote playlist `browse_id`
    async fn playlist_by_browse_id(&self, browse_id: &str) -> Result<Option<Playlist>>;

    /// Membership rows of a playlist ordered by position
    async fn playlist_songs(&self, playlist_id: &str) -> Result<Vec<PlaylistSongMap>>;

    /// Credited artists of a song in credit order
    async fn song_artists(&self, song_id: &str) -> Result<Vec<Artist>>;

    /// Track listing of an album in album order
    async fn album_songs(&self, album_id: &str) -> Result<Vec<Song>>;

    /// Start a new atomic unit of work
    async fn begin(&self) -> Result<Box<dyn LibraryTransaction>>;
}

/// A single atomic unit of work against the library
#[async_trait]
pub trait LibraryTransaction: Send {
    /// Insert a song unless one with the same id exists
    ///
    /// Returns `true` if a row was created. An existing song is left
    /// untouched, flags included.
    async fn insert_song(&mut self, song: &Song) -> Result<bool>;

    /// Insert an artist unless one with the same id exists
    async fn insert_artist(&mut self, artist: &Artist) -> Result<bool>;

    /// Insert an album unless one with the same id exists
    async fn insert_album(&mut self, album: &Album) -> Result<bool>;

    /// Insert a new playlist
    ///
    /// # Errors
    /// Fails if the id or a non-null `browse_id` is already taken.
    async fn insert_playlist(&mut self, playlist: &Playlist) -> Result<()>;

    /// Overwrite the remote-derived metadata of an existing playlist
    ///
    /// Returns `true` if any column changed. Bookmark and local id are
    /// never touched.
    async fn update_playlist_metadata(&mut self, playlist: &Playlist) -> Result<bool>;

    async fn link_song_artist(&mut self, link: &SongArtistMap) -> Result<()>;

    async fn link_song_album(&mut self, link: &SongAlbumMap) -> Result<()>;

    async fn link_album_artist(&mut self, link: &AlbumArtistMap) -> Result<()>;

    /// Delete every membership row of a playlist, returning how many went
    async fn clear_playlist(&mut self, playlist_id: &str) -> Result<u64>;

    async fn insert_playlist_song(&mut self, entry: &PlaylistSongMap) -> Result<()>;

    /// Set the bookmark of `kind` on row `id` to `at` if it is currently unset
    ///
    /// Returns `true` if a write happened.
    async fn mark(&mut self, kind: BookmarkKind, id: &str, at: i64) -> Result<bool>;

    /// Clear the bookmark of `kind` on row `id` if it is currently set
    ///
    /// Returns `true` if a write happened.
    async fn unmark(&mut self, kind: BookmarkKind, id: &str) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
