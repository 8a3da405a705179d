//! Sync configuration
//!
//! Remote collection identifiers per flow plus the knobs the runtime
//! configuration drives.

use crate::error::{Result, SyncError};
use core_runtime::config::{CoreConfig, DEFAULT_CONCURRENT_UPSERTS, MAX_CONCURRENT_UPSERTS};

/// Special playlist holding the user's liked songs.
pub const LIKED_SONGS_PLAYLIST_ID: &str = "LM";

/// Episodes-for-later playlist; never mirrored as a saved playlist.
pub const SAVED_EPISODES_PLAYLIST_ID: &str = "SE";

/// One remote listing: a collection id and an optional sub-tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionSource {
    pub browse_id: String,
    pub tab: Option<u32>,
}

impl CollectionSource {
    pub fn new(browse_id: impl Into<String>, tab: Option<u32>) -> Self {
        Self {
            browse_id: browse_id.into(),
            tab,
        }
    }
}

/// Configuration of the reconciliation flows.
///
/// For flows with several sources, the first source is the primary
/// collection and later ones are merged after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Playlist whose songs are the liked songs
    pub liked_songs_playlist: String,
    pub library_song_sources: Vec<CollectionSource>,
    pub liked_album_sources: Vec<CollectionSource>,
    pub artist_sources: Vec<CollectionSource>,
    pub saved_playlist_sources: Vec<CollectionSource>,
    /// Remote playlists ignored by the saved-playlists flow
    pub excluded_playlist_ids: Vec<String>,
    /// Per-item upserts allowed in flight within one flow
    pub max_concurrent_upserts: usize,
    /// Hand liked, not yet downloaded songs to the downloader after a liked-songs run
    pub auto_download_liked: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            liked_songs_playlist: LIKED_SONGS_PLAYLIST_ID.to_string(),
            library_song_sources: vec![
                CollectionSource::new("FEmusic_liked_videos", Some(0)),
                CollectionSource::new("FEmusic_library_privately_owned_tracks", Some(1)),
            ],
            liked_album_sources: vec![
                CollectionSource::new("FEmusic_liked_albums", Some(0)),
                CollectionSource::new("FEmusic_library_privately_owned_releases", Some(1)),
            ],
            artist_sources: vec![
                CollectionSource::new("FEmusic_library_corpus_track_artists", Some(0)),
                CollectionSource::new("FEmusic_library_privately_owned_artists", Some(1)),
            ],
            saved_playlist_sources: vec![CollectionSource::new("FEmusic_liked_playlists", None)],
            excluded_playlist_ids: vec![
                LIKED_SONGS_PLAYLIST_ID.to_string(),
                SAVED_EPISODES_PLAYLIST_ID.to_string(),
            ],
            max_concurrent_upserts: DEFAULT_CONCURRENT_UPSERTS,
            auto_download_liked: false,
        }
    }
}

impl From<&CoreConfig> for SyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            max_concurrent_upserts: config.max_concurrent_upserts,
            auto_download_liked: config.features.auto_download_liked,
            ..Self::default()
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_upserts == 0 || self.max_concurrent_upserts > MAX_CONCURRENT_UPSERTS
        {
            return Err(SyncError::Config(format!(
                "max_concurrent_upserts must be between 1 and {}, got {}",
                MAX_CONCURRENT_UPSERTS, self.max_concurrent_upserts
            )));
        }

        if self.liked_songs_playlist.trim().is_empty() {
            return Err(SyncError::Config(
                "liked_songs_playlist cannot be empty".to_string(),
            ));
        }

        for (name, sources) in [
            ("library_song_sources", &self.library_song_sources),
            ("liked_album_sources", &self.liked_album_sources),
            ("artist_sources", &self.artist_sources),
            ("saved_playlist_sources", &self.saved_playlist_sources),
        ] {
            if sources.is_empty() {
                return Err(SyncError::Config(format!("{name} needs at least one source")));
            }
            if sources.iter().any(|s| s.browse_id.trim().is_empty()) {
                return Err(SyncError::Config(format!("{name} has a blank browse id")));
            }
        }

        Ok(())
    }

    pub(crate) fn is_excluded_playlist(&self, browse_id: &str) -> bool {
        self.excluded_playlist_ids.iter().any(|id| id == browse_id)
    }
}
