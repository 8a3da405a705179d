//! Flow adapters for songs, albums and artists
//!
//! Each adapter is a row of the dispatch table the reconciler runs: where
//! its remote snapshot comes from, which local rows it owns and how one
//! remote item is written. Writes for one item always happen in a single
//! transaction: insert-if-absent first, then a conditional bookmark.

use crate::error::Result;
use crate::guard::SyncFlow;
use crate::reconciler::{fetch_merged, FlowAdapter, SyncContext, Upsert};
use crate::remote::{
    RemoteAlbum, RemoteAlbumPage, RemoteAlbumRef, RemoteArtist, RemoteArtistRef, RemoteItem,
    RemoteItemKind, RemoteSong,
};
use async_trait::async_trait;
use core_library::{
    now_timestamp, Album, AlbumArtistMap, Artist, BookmarkKind, LibraryTransaction, Song,
    SongAlbumMap, SongArtistMap,
};
use tracing::debug;

// =============================================================================
// Shared writers
// =============================================================================

/// Insert the credited artists that carry an id and link them to `song_id`
async fn insert_song_artists(
    tx: &mut dyn LibraryTransaction,
    song_id: &str,
    artists: &[RemoteArtistRef],
) -> Result<()> {
    let credited = artists.iter().filter_map(RemoteArtistRef::to_artist);

    for (position, artist) in credited.enumerate() {
        tx.insert_artist(&artist).await?;
        tx.link_song_artist(&SongArtistMap {
            song_id: song_id.to_string(),
            artist_id: artist.id,
            position: position as i32,
        })
        .await?;
    }

    Ok(())
}

/// Insert `song` and its artists unless the song exists
///
/// `bookmark` sets one song flag as part of the insert. Returns whether the
/// song row was created; an existing song is not touched.
pub(crate) async fn insert_remote_song(
    tx: &mut dyn LibraryTransaction,
    remote: &RemoteSong,
    bookmark: Option<(BookmarkKind, i64)>,
) -> Result<bool> {
    let song = match bookmark {
        Some((BookmarkKind::LikedSong, at)) => remote.to_song().liked_at(at),
        Some((BookmarkKind::LibrarySong, at)) => remote.to_song().in_library_at(at),
        _ => remote.to_song(),
    };

    if !tx.insert_song(&song).await? {
        return Ok(false);
    }

    insert_song_artists(tx, &song.id, &remote.artists).await?;
    Ok(true)
}

/// Insert a whole album page: album, credited artists, tracks and link rows
///
/// The album row is created with its bookmark set to `at`. Returns `false`
/// without writing anything else if the album already exists.
pub(crate) async fn insert_album_page(
    tx: &mut dyn LibraryTransaction,
    page: &RemoteAlbumPage,
    at: i64,
) -> Result<bool> {
    let mut album: Album = page.album.to_album();
    album.song_count = page.songs.len() as i32;
    album.duration = page.songs.iter().filter_map(|s| s.duration).sum();
    album.bookmarked_at = Some(at);

    if !tx.insert_album(&album).await? {
        return Ok(false);
    }

    let credited = page.album.artists.iter().filter_map(RemoteArtistRef::to_artist);
    for (position, artist) in credited.enumerate() {
        tx.insert_artist(&artist).await?;
        tx.link_album_artist(&AlbumArtistMap {
            album_id: album.id.clone(),
            artist_id: artist.id,
            position: position as i32,
        })
        .await?;
    }

    for (position, track) in page.songs.iter().enumerate() {
        let mut track = track.clone();
        if track.album.is_none() {
            track.album = Some(RemoteAlbumRef {
                id: album.id.clone(),
                name: album.title.clone(),
            });
        }
        insert_remote_song(tx, &track, None).await?;
        tx.link_song_album(&SongAlbumMap {
            song_id: track.id.clone(),
            album_id: album.id.clone(),
            position: position as i32,
        })
        .await?;
    }

    Ok(true)
}

/// Insert-with-bookmark or mark one song for `kind`
async fn upsert_song(ctx: &SyncContext, remote: RemoteSong, kind: BookmarkKind) -> Result<Upsert> {
    let now = now_timestamp();
    let mut tx = ctx.store.begin().await?;

    let outcome = if insert_remote_song(tx.as_mut(), &remote, Some((kind, now))).await? {
        Upsert::Inserted
    } else if tx.mark(kind, &remote.id, now).await? {
        Upsert::Updated
    } else {
        Upsert::Unchanged
    };

    tx.commit().await?;
    Ok(outcome)
}

// =============================================================================
// Songs
// =============================================================================

/// Songs of the liked-songs playlist
pub(crate) struct LikedSongsFlow;

#[async_trait]
impl FlowAdapter for LikedSongsFlow {
    type Remote = RemoteSong;
    type Local = Song;

    const FLOW: SyncFlow = SyncFlow::LikedSongs;
    const BOOKMARK: BookmarkKind = BookmarkKind::LikedSong;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<RemoteSong>> {
        let page = ctx.remote.playlist(&ctx.config.liked_songs_playlist).await?;
        Ok(page.songs.into_iter().rev().collect())
    }

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Song>> {
        Ok(ctx.store.liked_songs().await?)
    }

    fn remote_key(remote: &RemoteSong) -> &str {
        &remote.id
    }

    fn local_key(local: &Song) -> Option<&str> {
        Some(&local.id)
    }

    fn local_id(local: &Song) -> &str {
        &local.id
    }

    async fn upsert(ctx: &SyncContext, remote: RemoteSong) -> Result<Upsert> {
        upsert_song(ctx, remote, BookmarkKind::LikedSong).await
    }
}

/// Songs saved to the library, including uploads
pub(crate) struct LibrarySongsFlow;

#[async_trait]
impl FlowAdapter for LibrarySongsFlow {
    type Remote = RemoteSong;
    type Local = Song;

    const FLOW: SyncFlow = SyncFlow::LibrarySongs;
    const BOOKMARK: BookmarkKind = BookmarkKind::LibrarySong;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<RemoteSong>> {
        let items = fetch_merged(
            ctx.remote.as_ref(),
            &ctx.config.library_song_sources,
            RemoteItemKind::Song,
        )
        .await?;
        Ok(items.into_iter().filter_map(RemoteItem::into_song).collect())
    }

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Song>> {
        Ok(ctx.store.library_songs().await?)
    }

    fn remote_key(remote: &RemoteSong) -> &str {
        &remote.id
    }

    fn local_key(local: &Song) -> Option<&str> {
        Some(&local.id)
    }

    fn local_id(local: &Song) -> &str {
        &local.id
    }

    async fn upsert(ctx: &SyncContext, remote: RemoteSong) -> Result<Upsert> {
        upsert_song(ctx, remote, BookmarkKind::LibrarySong).await
    }
}

// =============================================================================
// Albums
// =============================================================================

pub(crate) struct LikedAlbumsFlow;

#[async_trait]
impl FlowAdapter for LikedAlbumsFlow {
    type Remote = RemoteAlbum;
    type Local = Album;

    const FLOW: SyncFlow = SyncFlow::LikedAlbums;
    const BOOKMARK: BookmarkKind = BookmarkKind::Album;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<RemoteAlbum>> {
        let items = fetch_merged(
            ctx.remote.as_ref(),
            &ctx.config.liked_album_sources,
            RemoteItemKind::Album,
        )
        .await?;
        Ok(items.into_iter().filter_map(RemoteItem::into_album).collect())
    }

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Album>> {
        Ok(ctx.store.liked_albums().await?)
    }

    fn remote_key(remote: &RemoteAlbum) -> &str {
        &remote.browse_id
    }

    fn local_key(local: &Album) -> Option<&str> {
        Some(&local.id)
    }

    fn local_id(local: &Album) -> &str {
        &local.id
    }

    /// Known albums are only bookmarked. Unknown ones need their detail page,
    /// whose failure stays local to this album.
    async fn upsert(ctx: &SyncContext, remote: RemoteAlbum) -> Result<Upsert> {
        let now = now_timestamp();

        if ctx.store.album(&remote.browse_id).await?.is_some() {
            let mut tx = ctx.store.begin().await?;
            let marked = tx.mark(BookmarkKind::Album, &remote.browse_id, now).await?;
            tx.commit().await?;
            return Ok(if marked { Upsert::Updated } else { Upsert::Unchanged });
        }

        let mut page = ctx.remote.album(&remote.browse_id).await?;
        // The listing id is canonical even if the detail page reports another
        page.album.browse_id = remote.browse_id.clone();
        debug!(album_id = %remote.browse_id, tracks = page.songs.len(), "Fetched album page");

        let mut tx = ctx.store.begin().await?;
        let outcome = if insert_album_page(tx.as_mut(), &page, now).await? {
            Upsert::Inserted
        } else if tx.mark(BookmarkKind::Album, &remote.browse_id, now).await? {
            Upsert::Updated
        } else {
            Upsert::Unchanged
        };
        tx.commit().await?;

        Ok(outcome)
    }
}

// =============================================================================
// Artists
// =============================================================================

pub(crate) struct ArtistSubscriptionsFlow;

#[async_trait]
impl FlowAdapter for ArtistSubscriptionsFlow {
    type Remote = RemoteArtist;
    type Local = Artist;

    const FLOW: SyncFlow = SyncFlow::ArtistSubscriptions;
    const BOOKMARK: BookmarkKind = BookmarkKind::Artist;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<RemoteArtist>> {
        let items = fetch_merged(
            ctx.remote.as_ref(),
            &ctx.config.artist_sources,
            RemoteItemKind::Artist,
        )
        .await?;
        Ok(items.into_iter().filter_map(RemoteItem::into_artist).collect())
    }

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Artist>> {
        Ok(ctx.store.bookmarked_artists().await?)
    }

    fn remote_key(remote: &RemoteArtist) -> &str {
        &remote.id
    }

    fn local_key(local: &Artist) -> Option<&str> {
        Some(&local.id)
    }

    fn local_id(local: &Artist) -> &str {
        &local.id
    }

    async fn upsert(ctx: &SyncContext, remote: RemoteArtist) -> Result<Upsert> {
        let now = now_timestamp();
        let mut artist = remote.to_artist();
        artist.bookmarked_at = Some(now);

        let mut tx = ctx.store.begin().await?;
        let outcome = if tx.insert_artist(&artist).await? {
            Upsert::Inserted
        } else if tx.mark(BookmarkKind::Artist, &remote.id, now).await? {
            Upsert::Updated
        } else {
            Upsert::Unchanged
        };
        tx.commit().await?;

        Ok(outcome)
    }
}
