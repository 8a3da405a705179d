//! # SQLite Library Store
//!
//! SQLite implementation of [`LibraryStore`] and [`LibraryTransaction`].
//!
//! ## Architecture
//!
//! - One module per entity (`song`, `album`, `artist`, `playlist`) holds the SQL
//! - `bookmark` holds the field-targeted mark/unmark statements
//! - Every statement is generic over `SqliteExecutor`, so reads go to the pool
//!   and writes go through the open `sqlx::Transaction`
//! - A [`SqliteLibraryTransaction`] dropped without commit rolls back

pub(crate) mod album;
pub(crate) mod artist;
pub(crate) mod bookmark;
pub(crate) mod playlist;
pub(crate) mod song;

use crate::error::Result;
use crate::models::{
    Album, AlbumArtistMap, Artist, BookmarkKind, Playlist, PlaylistSongMap, Song, SongAlbumMap,
    SongArtistMap,
};
use crate::store::{LibraryStore, LibraryTransaction};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// SQLite-backed library store
#[derive(Clone)]
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    /// Create a store over an already migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    async fn liked_songs(&self) -> Result<Vec<Song>> {
        song::liked(&self.pool).await
    }

    async fn library_songs(&self) -> Result<Vec<Song>> {
        song::in_library(&self.pool).await
    }

    async fn liked_songs_not_downloaded(&self) -> Result<Vec<Song>> {
        song::liked_not_downloaded(&self.pool).await
    }

    async fn liked_albums(&self) -> Result<Vec<Album>> {
        album::bookmarked(&self.pool).await
    }

    async fn bookmarked_artists(&self) -> Result<Vec<Artist>> {
        artist::bookmarked(&self.pool).await
    }

    async fn playlists(&self) -> Result<Vec<Playlist>> {
        playlist::all(&self.pool).await
    }

    async fn song(&self, id: &str) -> Result<Option<Song>> {
        song::find_by_id(&self.pool, id).await
    }

    async fn album(&self, id: &str) -> Result<Option<Album>> {
        album::find_by_id(&self.pool, id).await
    }

    async fn artist(&self, id: &str) -> Result<Option<Artist>> {
        artist::find_by_id(&self.pool, id).await
    }

    async fn playlist(&self, id: &str) -> Result<Option<Playlist>> {
        playlist::find_by_id(&self.pool, id).await
    }

    async fn playlist_by_browse_id(&self, browse_id: &str) -> Result<Option<Playlist>> {
        playlist::find_by_browse_id(&self.pool, browse_id).await
    }

    async fn playlist_songs(&self, playlist_id: &str) -> Result<Vec<PlaylistSongMap>> {
        playlist::songs(&self.pool, playlist_id).await
    }

    async fn song_artists(&self, song_id: &str) -> Result<Vec<Artist>> {
        song::artists(&self.pool, song_id).await
    }

    async fn album_songs(&self, album_id: &str) -> Result<Vec<Song>> {
        song::by_album(&self.pool, album_id).await
    }

    async fn begin(&self) -> Result<Box<dyn LibraryTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteLibraryTransaction { tx }))
    }
}

/// An open SQLite transaction
pub struct SqliteLibraryTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LibraryTransaction for SqliteLibraryTransaction {
    async fn insert_song(&mut self, song: &Song) -> Result<bool> {
        song::insert_if_absent(&mut *self.tx, song).await
    }

    async fn insert_artist(&mut self, artist: &Artist) -> Result<bool> {
        artist::insert_if_absent(&mut *self.tx, artist).await
    }

    async fn insert_album(&mut self, album: &Album) -> Result<bool> {
        album::insert_if_absent(&mut *self.tx, album).await
    }

    async fn insert_playlist(&mut self, playlist: &Playlist) -> Result<()> {
        playlist::insert(&mut *self.tx, playlist).await
    }

    async fn update_playlist_metadata(&mut self, playlist: &Playlist) -> Result<bool> {
        playlist::update_metadata(&mut *self.tx, playlist).await
    }

    async fn link_song_artist(&mut self, link: &SongArtistMap) -> Result<()> {
        song::link_artist(&mut *self.tx, link).await
    }

    async fn link_song_album(&mut self, link: &SongAlbumMap) -> Result<()> {
        song::link_album(&mut *self.tx, link).await
    }

    async fn link_album_artist(&mut self, link: &AlbumArtistMap) -> Result<()> {
        album::link_artist(&mut *self.tx, link).await
    }

    async fn clear_playlist(&mut self, playlist_id: &str) -> Result<u64> {
        playlist::clear_songs(&mut *self.tx, playlist_id).await
    }

    async fn insert_playlist_song(&mut self, entry: &PlaylistSongMap) -> Result<()> {
        playlist::insert_song(&mut *self.tx, entry).await
    }

    async fn mark(&mut self, kind: BookmarkKind, id: &str, at: i64) -> Result<bool> {
        bookmark::mark(&mut *self.tx, kind, id, at).await
    }

    async fn unmark(&mut self, kind: BookmarkKind, id: &str) -> Result<bool> {
        bookmark::unmark(&mut *self.tx, kind, id).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteLibraryTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let SqliteLibraryTransaction { tx } = *self;
        tx.rollback().await?;
        debug!("Library transaction rolled back");
        Ok(())
    }
}
