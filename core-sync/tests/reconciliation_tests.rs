//! Integration tests for the reconciliation flows
//!
//! These run the public service against a real in-memory SQLite store and a
//! hand-written fake remote library, covering:
//! - Idempotence and convergence of every flow
//! - Exemption of locally-created playlists
//! - Per-flow mutual exclusion and guard release on failure or abort
//! - Playlist content replacement and isolated item failures
//! - Fail-closed behavior on list fetch failure
//! - Lifecycle events and the auto-download hook

use async_trait::async_trait;
use core_library::{
    create_test_pool, Album, Artist, LibraryStore, Playlist, Song, SqliteLibraryStore,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{
    AutoDownloader, FlowOutcome, LibrarySyncService, RemoteAlbum, RemoteAlbumPage, RemoteArtist,
    RemoteArtistRef, RemoteError, RemoteItem, RemoteLibrary, RemotePlaylist, RemotePlaylistPage,
    RemoteSong, SyncConfig, SyncError, SyncFlow,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Fake Implementations
// ============================================================================

/// Pauses a collection fetch until released
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

/// In-memory remote library
#[derive(Default)]
struct FakeRemote {
    collections: Mutex<HashMap<String, Vec<RemoteItem>>>,
    playlists: Mutex<HashMap<String, RemotePlaylistPage>>,
    albums: Mutex<HashMap<String, RemoteAlbumPage>>,
    failing_collections: Mutex<HashSet<String>>,
    failing_albums: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    album_fetches: Mutex<Vec<String>>,
}

impl FakeRemote {
    fn set_collection(&self, browse_id: &str, items: Vec<RemoteItem>) {
        self.collections
            .lock()
            .unwrap()
            .insert(browse_id.to_string(), items);
    }

    fn set_playlist(&self, browse_id: &str, songs: Vec<RemoteSong>) {
        self.playlists.lock().unwrap().insert(
            browse_id.to_string(),
            RemotePlaylistPage {
                playlist: RemotePlaylist::new(browse_id, browse_id),
                songs,
            },
        );
    }

    fn set_album(&self, page: RemoteAlbumPage) {
        self.albums
            .lock()
            .unwrap()
            .insert(page.album.browse_id.clone(), page);
    }

    fn fail_collection(&self, browse_id: &str) {
        self.failing_collections
            .lock()
            .unwrap()
            .insert(browse_id.to_string());
    }

    fn fail_album(&self, browse_id: &str) {
        self.failing_albums
            .lock()
            .unwrap()
            .insert(browse_id.to_string());
    }

    fn gate(&self, browse_id: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(browse_id.to_string(), Arc::clone(&gate));
        gate
    }

    fn album_fetches(&self) -> Vec<String> {
        self.album_fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteLibrary for FakeRemote {
    async fn library_items(
        &self,
        browse_id: &str,
        _tab: Option<u32>,
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        let gate = self.gates.lock().unwrap().get(browse_id).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.failing_collections.lock().unwrap().contains(browse_id) {
            return Err(RemoteError::Network(format!("{browse_id} unreachable")));
        }

        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(browse_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn playlist(&self, browse_id: &str) -> Result<RemotePlaylistPage, RemoteError> {
        self.playlists
            .lock()
            .unwrap()
            .get(browse_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(browse_id.to_string()))
    }

    async fn album(&self, browse_id: &str) -> Result<RemoteAlbumPage, RemoteError> {
        self.album_fetches
            .lock()
            .unwrap()
            .push(browse_id.to_string());

        if self.failing_albums.lock().unwrap().contains(browse_id) {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("{browse_id} failed"),
            });
        }

        self.albums
            .lock()
            .unwrap()
            .get(browse_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(browse_id.to_string()))
    }
}

/// Records every batch it is handed
#[derive(Default)]
struct RecordingDownloader {
    batches: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

#[async_trait]
impl AutoDownloader for RecordingDownloader {
    async fn enqueue(&self, songs: Vec<Song>) -> core_sync::Result<()> {
        self.batches
            .lock()
            .unwrap()
            .push(songs.into_iter().map(|s| s.id).collect());
        if self.fail {
            return Err(SyncError::Download("disk full".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

const LIKED_ALBUMS: &str = "FEmusic_liked_albums";
const LIBRARY_SONGS: &str = "FEmusic_liked_videos";
const ARTISTS: &str = "FEmusic_library_corpus_track_artists";
const SAVED_PLAYLISTS: &str = "FEmusic_liked_playlists";

async fn setup(
    remote: &Arc<FakeRemote>,
    bus: Option<Arc<EventBus>>,
) -> (Arc<LibrarySyncService>, Arc<SqliteLibraryStore>) {
    let store = Arc::new(SqliteLibraryStore::new(create_test_pool().await.unwrap()));
    let service = LibrarySyncService::new(
        SyncConfig::default(),
        remote.clone(),
        store.clone(),
        bus,
    )
    .unwrap();
    (Arc::new(service), store)
}

fn song(id: &str) -> RemoteSong {
    let mut song = RemoteSong::new(id, format!("Song {id}"));
    song.artists = vec![RemoteArtistRef {
        id: Some("UC_band".to_string()),
        name: "Band".to_string(),
    }];
    song
}

fn song_item(id: &str) -> RemoteItem {
    RemoteItem::Song(song(id))
}

fn album_item(id: &str) -> RemoteItem {
    RemoteItem::Album(RemoteAlbum::new(id, format!("Album {id}")))
}

fn album_page(id: &str, tracks: &[&str]) -> RemoteAlbumPage {
    RemoteAlbumPage {
        album: RemoteAlbum::new(id, format!("Album {id}")),
        songs: tracks.iter().map(|t| song(t)).collect(),
    }
}

fn ids<T>(rows: Vec<T>, id: impl Fn(T) -> String) -> Vec<String> {
    let mut ids: Vec<String> = rows.into_iter().map(id).collect();
    ids.sort();
    ids
}

fn completed(outcome: FlowOutcome) -> core_sync::ReconcileReport {
    match outcome {
        FlowOutcome::Completed(report) => report,
        FlowOutcome::Skipped => panic!("flow was skipped"),
    }
}

/// Remote state touching every flow
fn populate(remote: &FakeRemote) {
    remote.set_playlist("LM", vec![song("s2"), song("s1")]);
    remote.set_collection(LIBRARY_SONGS, vec![song_item("s3"), song_item("s1")]);
    remote.set_collection(LIKED_ALBUMS, vec![album_item("MPREb_1")]);
    remote.set_album(album_page("MPREb_1", &["t1", "t2"]));
    remote.set_collection(
        ARTISTS,
        vec![RemoteItem::Artist(RemoteArtist::new("UC_fav", "Favourite"))],
    );
    remote.set_collection(
        SAVED_PLAYLISTS,
        vec![RemoteItem::Playlist(RemotePlaylist::new("PL_mix", "Mix"))],
    );
    remote.set_playlist("PL_mix", vec![song("s1"), song("p1")]);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let remote = Arc::new(FakeRemote::default());
    populate(&remote);
    let (service, _store) = setup(&remote, None).await;

    let first = service.sync_all().await;
    assert!(first.is_success());
    let first_writes: usize = first
        .iter()
        .filter_map(|(_, o)| o.as_ref().ok().and_then(FlowOutcome::report))
        .map(|r| r.writes())
        .sum();
    assert!(first_writes > 0);

    let second = service.sync_all().await;
    for (flow, outcome) in second.iter() {
        let report = outcome.as_ref().unwrap().report().unwrap();
        assert_eq!(report.writes(), 0, "{flow} wrote on an unchanged remote");
        assert!(report.is_clean());
    }
}

#[tokio::test]
async fn test_local_bookmarks_converge_to_remote() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![song("keep"), song("new")]);
    remote.set_collection(
        ARTISTS,
        vec![RemoteItem::Artist(RemoteArtist::new("UC_keep", "Keep"))],
    );
    let (service, store) = setup(&remote, None).await;

    let mut tx = store.begin().await.unwrap();
    for id in ["keep", "gone"] {
        tx.insert_song(&Song::new(id, id).liked_at(1)).await.unwrap();
    }
    for id in ["UC_keep", "UC_gone"] {
        let mut artist = Artist::new(id, id);
        artist.bookmarked_at = Some(1);
        tx.insert_artist(&artist).await.unwrap();
    }
    tx.commit().await.unwrap();

    let liked = completed(service.sync_liked_songs().await.unwrap());
    assert_eq!(liked.inserted, 1);
    assert_eq!(liked.unbookmarked, 1);

    let artists = completed(service.sync_artist_subscriptions().await.unwrap());
    assert_eq!(artists.unbookmarked, 1);

    assert_eq!(
        ids(store.liked_songs().await.unwrap(), |s| s.id),
        vec!["keep", "new"]
    );
    assert_eq!(
        ids(store.bookmarked_artists().await.unwrap(), |a| a.id),
        vec!["UC_keep"]
    );

    let gone = store.song("gone").await.unwrap().unwrap();
    assert!(!gone.liked);
    assert_eq!(gone.liked_at, None);
}

#[tokio::test]
async fn test_liked_and_library_flags_are_independent() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![]);
    remote.set_collection(LIBRARY_SONGS, vec![song_item("both")]);
    let (service, store) = setup(&remote, None).await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_song(&Song::new("both", "both").liked_at(1).in_library_at(1))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    service.sync_liked_songs().await.unwrap();
    service.sync_library_songs().await.unwrap();

    let both = store.song("both").await.unwrap().unwrap();
    assert!(!both.liked, "absent from liked songs");
    assert_eq!(both.in_library, Some(1), "library bookmark untouched");
}

#[tokio::test]
async fn test_local_playlists_are_never_unbookmarked() {
    let remote = Arc::new(FakeRemote::default());
    let (service, store) = setup(&remote, None).await;

    let mut local = Playlist::new("On this device");
    local.bookmarked_at = Some(1);
    let mut remote_backed = Playlist::remote("Removed remotely", "PL_old");
    remote_backed.bookmarked_at = Some(1);
    let mut tx = store.begin().await.unwrap();
    tx.insert_playlist(&local).await.unwrap();
    tx.insert_playlist(&remote_backed).await.unwrap();
    tx.commit().await.unwrap();

    let report = completed(service.sync_saved_playlists().await.unwrap());
    assert_eq!(report.unbookmarked, 1);

    let local = store.playlist(&local.id).await.unwrap().unwrap();
    assert_eq!(local.bookmarked_at, Some(1));
    let remote_backed = store.playlist(&remote_backed.id).await.unwrap().unwrap();
    assert_eq!(remote_backed.bookmarked_at, None);
}

#[tokio::test]
async fn test_concurrent_invocation_is_skipped() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_collection(
        ARTISTS,
        vec![RemoteItem::Artist(RemoteArtist::new("UC_fav", "Favourite"))],
    );
    let gate = remote.gate(ARTISTS);
    let (service, store) = setup(&remote, None).await;

    let running = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.sync_artist_subscriptions().await }
    });
    gate.entered.notified().await;

    assert!(service.is_syncing(SyncFlow::ArtistSubscriptions));
    let second = service.sync_artist_subscriptions().await.unwrap();
    assert_eq!(second, FlowOutcome::Skipped);

    // Other flows are unaffected
    assert!(!service.is_syncing(SyncFlow::LikedAlbums));

    gate.release.notify_one();
    let first = completed(running.await.unwrap().unwrap());
    assert_eq!(first.inserted, 1);
    assert!(!service.is_syncing(SyncFlow::ArtistSubscriptions));
    assert_eq!(store.bookmarked_artists().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_aborted_flow_releases_guard() {
    let remote = Arc::new(FakeRemote::default());
    let gate = remote.gate(ARTISTS);
    let (service, _store) = setup(&remote, None).await;
    let mut status = service.subscribe_status(SyncFlow::ArtistSubscriptions);

    let running = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.sync_artist_subscriptions().await }
    });
    gate.entered.notified().await;
    assert!(*status.borrow_and_update());

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());
    assert!(!service.is_syncing(SyncFlow::ArtistSubscriptions));
    assert!(!*status.borrow_and_update());
}

#[tokio::test]
async fn test_playlist_content_is_replaced() {
    let remote = Arc::new(FakeRemote::default());
    let (service, store) = setup(&remote, None).await;

    let playlist = Playlist::remote("Mix", "PL_mix");
    let mut tx = store.begin().await.unwrap();
    tx.insert_playlist(&playlist).await.unwrap();
    tx.commit().await.unwrap();
    remote.set_playlist("PL_mix", vec![song("old1"), song("old2"), song("old3"), song("old4")]);
    service.sync_playlist("PL_mix", &playlist.id).await.unwrap();

    remote.set_playlist("PL_mix", vec![song("s1"), song("s2"), song("s3")]);
    let written = service.sync_playlist("PL_mix", &playlist.id).await.unwrap();
    assert_eq!(written, 3);

    let entries = store.playlist_songs(&playlist.id).await.unwrap();
    let rows: Vec<(i32, String)> = entries
        .into_iter()
        .map(|e| (e.position, e.song_id))
        .collect();
    assert_eq!(
        rows,
        vec![
            (0, "s1".to_string()),
            (1, "s2".to_string()),
            (2, "s3".to_string())
        ]
    );

    let s1 = store.song("s1").await.unwrap().unwrap();
    assert!(!s1.liked, "content sync leaves song flags alone");
    assert_eq!(s1.in_library, None);
}

#[tokio::test]
async fn test_failing_album_detail_is_isolated() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_collection(
        LIKED_ALBUMS,
        vec![album_item("a3"), album_item("a2"), album_item("a1")],
    );
    remote.set_album(album_page("a1", &["a1t1"]));
    remote.set_album(album_page("a3", &["a3t1", "a3t2"]));
    remote.fail_album("a2");
    let (service, store) = setup(&remote, None).await;

    let report = completed(service.sync_liked_albums().await.unwrap());
    assert_eq!(report.fetched, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "a2");

    assert_eq!(
        ids(store.liked_albums().await.unwrap(), |a| a.id),
        vec!["a1", "a3"]
    );
    assert!(store.album("a2").await.unwrap().is_none());
    assert_eq!(store.album_songs("a3").await.unwrap().len(), 2);
    assert!(!service.is_syncing(SyncFlow::LikedAlbums));
}

#[tokio::test]
async fn test_list_failure_changes_nothing() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_collection(LIKED_ALBUMS, vec![album_item("a1")]);
    remote.fail_collection("FEmusic_library_privately_owned_releases");
    let (service, store) = setup(&remote, None).await;

    let mut saved = Album::new("a_local", "Saved");
    saved.bookmarked_at = Some(1);
    let mut tx = store.begin().await.unwrap();
    tx.insert_album(&saved).await.unwrap();
    tx.commit().await.unwrap();

    let result = service.sync_liked_albums().await;
    assert!(matches!(result, Err(SyncError::Remote(RemoteError::Network(_)))));

    assert!(remote.album_fetches().is_empty());
    assert_eq!(
        ids(store.liked_albums().await.unwrap(), |a| a.id),
        vec!["a_local"]
    );
    assert!(!service.is_syncing(SyncFlow::LikedAlbums));

    // The guard is free for the next attempt
    remote.failing_collections.lock().unwrap().clear();
    let retry = completed(service.sync_liked_albums().await.unwrap());
    assert_eq!(retry.inserted, 0);
    assert_eq!(retry.failures.len(), 1, "a1 has no album page");
}

#[tokio::test]
async fn test_lifecycle_events() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![song("s1"), song("s2")]);
    let bus = Arc::new(EventBus::new(16));
    let mut events = bus.subscribe();
    let (service, _store) = setup(&remote, Some(bus)).await;

    service.sync_liked_songs().await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Sync(SyncEvent::Started {
            flow: "liked_songs".to_string()
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Sync(SyncEvent::Completed {
            flow: "liked_songs".to_string(),
            inserted: 2,
            updated: 0,
            unbookmarked: 0,
            failed: 0,
        })
    );
}

#[tokio::test]
async fn test_auto_download_after_liked_songs() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![song("s1")]);

    let store = Arc::new(SqliteLibraryStore::new(create_test_pool().await.unwrap()));
    let downloader = Arc::new(RecordingDownloader::default());
    let config = SyncConfig {
        auto_download_liked: true,
        ..SyncConfig::default()
    };
    let service = LibrarySyncService::new(config, remote.clone(), store.clone(), None)
        .unwrap()
        .with_downloader(downloader.clone());

    service.sync_liked_songs().await.unwrap();
    assert_eq!(
        downloader.batches.lock().unwrap().clone(),
        vec![vec!["s1".to_string()]]
    );

    // Other flows never trigger downloads
    service.sync_library_songs().await.unwrap();
    assert_eq!(downloader.batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_auto_download_runs_when_liked_listing_fails() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![song("s1")]);

    let store = Arc::new(SqliteLibraryStore::new(create_test_pool().await.unwrap()));
    let downloader = Arc::new(RecordingDownloader::default());
    let config = SyncConfig {
        auto_download_liked: true,
        ..SyncConfig::default()
    };
    let service = LibrarySyncService::new(config, remote.clone(), store.clone(), None)
        .unwrap()
        .with_downloader(downloader.clone());

    service.sync_liked_songs().await.unwrap();
    remote.playlists.lock().unwrap().remove("LM");

    let result = service.sync_liked_songs().await;
    assert!(matches!(result, Err(SyncError::Remote(_))));
    assert_eq!(
        downloader.batches.lock().unwrap().clone(),
        vec![vec!["s1".to_string()], vec!["s1".to_string()]]
    );
    assert!(!service.is_syncing(SyncFlow::LikedSongs));
}

#[tokio::test]
async fn test_download_failure_does_not_fail_flow() {
    let remote = Arc::new(FakeRemote::default());
    remote.set_playlist("LM", vec![song("s1")]);

    let store = Arc::new(SqliteLibraryStore::new(create_test_pool().await.unwrap()));
    let downloader = Arc::new(RecordingDownloader {
        fail: true,
        ..RecordingDownloader::default()
    });
    let config = SyncConfig {
        auto_download_liked: true,
        ..SyncConfig::default()
    };
    let service = LibrarySyncService::new(config, remote, store, None)
        .unwrap()
        .with_downloader(downloader.clone());

    let report = completed(service.sync_liked_songs().await.unwrap());
    assert_eq!(report.inserted, 1);
    assert_eq!(downloader.batches.lock().unwrap().len(), 1);
}
