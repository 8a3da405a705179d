//! Saved playlists
//!
//! Playlists reconcile in two steps. The metadata pass is a regular
//! reconciler run keyed by `browse_id`; playlists without one were created
//! locally and are never touched. The content pass then replaces the song
//! list of every remote playlist wholesale.

use crate::error::{Result, SyncError};
use crate::flows::insert_remote_song;
use crate::guard::SyncFlow;
use crate::reconciler::{
    fetch_merged, reconcile_items, FlowAdapter, ItemFailure, ReconcileReport, SyncContext,
    Upsert, UpsertTasks,
};
use crate::remote::{RemoteItem, RemoteItemKind, RemotePlaylist};
use async_trait::async_trait;
use core_library::{now_timestamp, BookmarkKind, Playlist, PlaylistSongMap};
use core_runtime::events::{CoreEvent, LibraryEvent};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Replace the songs of local playlist `playlist_id` with the remote
/// playlist `browse_id`
///
/// The remote page is fetched first; if that fails the local content is
/// left as it was. Otherwise old membership is cleared and the new songs
/// are written at positions `0..N` in one transaction. Returns the number
/// of songs written.
pub(crate) async fn replace_playlist_content(
    ctx: &SyncContext,
    browse_id: &str,
    playlist_id: &str,
) -> Result<usize> {
    let page = ctx.remote.playlist(browse_id).await?;

    let mut tx = ctx.store.begin().await?;
    let removed = tx.clear_playlist(playlist_id).await?;

    for (position, song) in page.songs.iter().enumerate() {
        insert_remote_song(tx.as_mut(), song, None).await?;
        tx.insert_playlist_song(&PlaylistSongMap {
            playlist_id: playlist_id.to_string(),
            song_id: song.id.clone(),
            position: position as i32,
            set_video_id: song.set_video_id.clone(),
        })
        .await?;
    }

    tx.commit().await?;

    debug!(
        playlist_id,
        browse_id,
        removed,
        songs = page.songs.len(),
        "Playlist content replaced"
    );

    if let Some(events) = &ctx.events {
        events
            .emit(CoreEvent::Library(LibraryEvent::PlaylistContentReplaced {
                playlist_id: playlist_id.to_string(),
                song_count: page.songs.len() as u64,
            }))
            .ok();
    }

    Ok(page.songs.len())
}

pub(crate) struct SavedPlaylistsFlow;

#[async_trait]
impl FlowAdapter for SavedPlaylistsFlow {
    type Remote = RemotePlaylist;
    type Local = Playlist;

    const FLOW: SyncFlow = SyncFlow::SavedPlaylists;
    const BOOKMARK: BookmarkKind = BookmarkKind::Playlist;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<RemotePlaylist>> {
        let items = fetch_merged(
            ctx.remote.as_ref(),
            &ctx.config.saved_playlist_sources,
            RemoteItemKind::Playlist,
        )
        .await?;

        Ok(items
            .into_iter()
            .filter_map(RemoteItem::into_playlist)
            .filter(|p| !ctx.config.is_excluded_playlist(&p.id))
            .collect())
    }

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Playlist>> {
        let playlists = ctx.store.playlists().await?;
        Ok(playlists
            .into_iter()
            .filter(|p| p.bookmarked_at.is_some())
            .collect())
    }

    fn remote_key(remote: &RemotePlaylist) -> &str {
        &remote.id
    }

    fn local_key(local: &Playlist) -> Option<&str> {
        local.browse_id.as_deref()
    }

    fn local_id(local: &Playlist) -> &str {
        &local.id
    }

    async fn upsert(ctx: &SyncContext, remote: RemotePlaylist) -> Result<Upsert> {
        let now = now_timestamp();
        let existing = ctx.store.playlist_by_browse_id(&remote.id).await?;

        let mut tx = ctx.store.begin().await?;
        let outcome = match existing {
            None => {
                let mut playlist = remote.to_playlist();
                playlist.bookmarked_at = Some(now);
                tx.insert_playlist(&playlist).await?;
                Upsert::Inserted
            }
            Some(current) => {
                let mut refreshed = current.clone();
                remote.apply_to(&mut refreshed);
                refreshed.updated_at = now;

                let changed = !current.same_remote_metadata(&refreshed)
                    && tx.update_playlist_metadata(&refreshed).await?;
                let marked = tx.mark(BookmarkKind::Playlist, &current.id, now).await?;

                if changed || marked {
                    Upsert::Updated
                } else {
                    Upsert::Unchanged
                }
            }
        };
        tx.commit().await?;

        Ok(outcome)
    }
}

/// Run the saved-playlists flow: metadata reconciliation, then a content
/// refresh of every remote playlist
///
/// Content failures are isolated per playlist and land in the report's
/// failures, keyed by browse id.
pub(crate) async fn sync_saved_playlists(ctx: &Arc<SyncContext>) -> Result<ReconcileReport> {
    let remote = SavedPlaylistsFlow::fetch_remote(ctx).await.map_err(|e| {
        warn!(flow = %SyncFlow::SavedPlaylists, error = %e, "Remote listing failed; nothing reconciled");
        e
    })?;
    let browse_ids: Vec<String> = remote.iter().map(|p| p.id.clone()).collect();

    let mut report = reconcile_items::<SavedPlaylistsFlow>(ctx, remote).await?;

    let semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_upserts));
    let mut tasks = UpsertTasks::with_capacity(browse_ids.len());

    for browse_id in browse_ids {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| SyncError::Join(e.to_string()))?;
        let ctx = Arc::clone(ctx);
        let key = browse_id.clone();

        let handle = tokio::spawn(async move {
            let result = match ctx.store.playlist_by_browse_id(&browse_id).await {
                Ok(Some(playlist)) => replace_playlist_content(&ctx, &browse_id, &playlist.id)
                    .await
                    .map(Some),
                // Its metadata upsert failed and is already reported
                Ok(None) => Ok(None),
                Err(e) => Err(e.into()),
            };
            drop(permit);
            result
        });

        tasks.push(key, handle);
    }

    let mut refreshed = 0usize;
    for (browse_id, handle) in tasks.iter_mut() {
        let failure = match handle.await {
            Ok(Ok(Some(_))) => {
                refreshed += 1;
                None
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(SyncError::Join(e.to_string()).to_string()),
        };

        if let Some(reason) = failure {
            warn!(browse_id = %browse_id, error = %reason, "Playlist content refresh failed");
            report.failures.push(ItemFailure {
                id: browse_id.clone(),
                reason,
            });
        }
    }

    info!(
        playlists = report.fetched,
        refreshed,
        failed = report.failures.len(),
        "Saved playlists reconciled"
    );

    Ok(report)
}
