//! Domain models for the local library
//!
//! Songs, albums and artists are keyed by their remote-assigned ids.
//! Playlists carry a local id plus an optional remote `browse_id`; a
//! playlist without a `browse_id` was created locally and is never touched
//! by reconciliation.
//!
//! Membership in a remote collection is expressed solely through nullable
//! bookmark timestamps (`liked_at`, `in_library`, `bookmarked_at`). Rows are
//! never deleted to express "no longer liked".

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Current time as unix seconds, the unit of every timestamp in the library.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// =============================================================================
// Bookmark kinds
// =============================================================================

/// Every field through which a remote collection marks a local row.
///
/// Each kind maps to exactly one table and one nullable column, so writes
/// addressed by kind only ever touch that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookmarkKind {
    /// `songs.liked` / `songs.liked_at`
    LikedSong,
    /// `songs.in_library`
    LibrarySong,
    /// `albums.bookmarked_at`
    Album,
    /// `artists.bookmarked_at`
    Artist,
    /// `playlists.bookmarked_at`
    Playlist,
}

impl BookmarkKind {
    pub const ALL: [BookmarkKind; 5] = [
        BookmarkKind::LikedSong,
        BookmarkKind::LibrarySong,
        BookmarkKind::Album,
        BookmarkKind::Artist,
        BookmarkKind::Playlist,
    ];

    /// Entity name used in errors and logs.
    pub fn entity_type(self) -> &'static str {
        match self {
            BookmarkKind::LikedSong | BookmarkKind::LibrarySong => "Song",
            BookmarkKind::Album => "Album",
            BookmarkKind::Artist => "Artist",
            BookmarkKind::Playlist => "Playlist",
        }
    }
}

impl fmt::Display for BookmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookmarkKind::LikedSong => "liked_song",
            BookmarkKind::LibrarySong => "library_song",
            BookmarkKind::Album => "album",
            BookmarkKind::Artist => "artist",
            BookmarkKind::Playlist => "playlist",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A song known to the local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    /// Remote-assigned video id
    pub id: String,
    pub title: String,
    /// Duration in seconds
    pub duration: Option<i32>,
    pub thumbnail_url: Option<String>,
    /// Album reference as reported by the remote listing
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub explicit: bool,
    /// Liked on the remote service
    pub liked: bool,
    /// When the like was recorded locally
    pub liked_at: Option<i64>,
    /// Saved to the remote library at; `None` means not in the library
    pub in_library: Option<i64>,
    /// Set by the download manager once the audio is stored offline
    pub downloaded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Song {
    /// Create a song with no flags set
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: id.into(),
            title: title.into(),
            duration: None,
            thumbnail_url: None,
            album_id: None,
            album_name: None,
            explicit: false,
            liked: false,
            liked_at: None,
            in_library: None,
            downloaded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with the liked flag set at `at`
    pub fn liked_at(mut self, at: i64) -> Self {
        self.liked = true;
        self.liked_at = Some(at);
        self
    }

    /// Copy with the library bookmark set at `at`
    pub fn in_library_at(mut self, at: i64) -> Self {
        self.in_library = Some(at);
        self
    }

    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Song id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Song title cannot be empty".to_string());
        }

        if let Some(duration) = self.duration {
            if duration < 0 {
                return Err("Song duration cannot be negative".to_string());
            }
        }

        if self.liked != self.liked_at.is_some() {
            return Err("Song liked flag and liked_at must agree".to_string());
        }

        Ok(())
    }
}

/// An album known to the local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    /// Remote browse id of the album
    pub id: String,
    /// Remote playlist id that plays the album
    pub playlist_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub song_count: i32,
    /// Total duration in seconds
    pub duration: i32,
    /// Liked/saved on the remote service at; `None` means not saved
    pub bookmarked_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: id.into(),
            playlist_id: None,
            title: title.into(),
            year: None,
            thumbnail_url: None,
            song_count: 0,
            duration: 0,
            bookmarked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Album id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Album title cannot be empty".to_string());
        }

        if self.song_count < 0 {
            return Err("Song count cannot be negative".to_string());
        }

        Ok(())
    }
}

/// An artist known to the local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    /// Remote browse id of the artist
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    /// Channel the artist publishes from
    pub channel_id: Option<String>,
    /// Subscribed on the remote service at; `None` means not subscribed
    pub bookmarked_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Artist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail_url: None,
            channel_id: None,
            bookmarked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate artist data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Artist id cannot be empty".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// A playlist, either created locally or mirrored from the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    /// Local identifier
    pub id: String,
    pub name: String,
    /// Remote identifier; `None` for locally-created playlists
    pub browse_id: Option<String>,
    /// Whether the remote service lets this user edit the playlist
    pub is_editable: bool,
    /// Saved on the remote service at; `None` means not saved
    pub bookmarked_at: Option<i64>,
    /// Song count last reported by the remote listing
    pub remote_song_count: Option<i32>,
    pub play_endpoint_params: Option<String>,
    pub shuffle_endpoint_params: Option<String>,
    pub radio_endpoint_params: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    /// Create a locally-owned playlist
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            browse_id: None,
            is_editable: true,
            bookmarked_at: None,
            remote_song_count: None,
            play_endpoint_params: None,
            shuffle_endpoint_params: None,
            radio_endpoint_params: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a playlist backed by the remote playlist `browse_id`
    pub fn remote(name: impl Into<String>, browse_id: impl Into<String>) -> Self {
        Self {
            browse_id: Some(browse_id.into()),
            is_editable: false,
            ..Self::new(name)
        }
    }

    /// Locally-created playlists are exempt from reconciliation
    pub fn is_local_only(&self) -> bool {
        self.browse_id.is_none()
    }

    /// Whether the remote-derived metadata of `self` and `other` match
    pub fn same_remote_metadata(&self, other: &Playlist) -> bool {
        self.name == other.name
            && self.browse_id == other.browse_id
            && self.is_editable == other.is_editable
            && self.remote_song_count == other.remote_song_count
            && self.play_endpoint_params == other.play_endpoint_params
            && self.shuffle_endpoint_params == other.shuffle_endpoint_params
            && self.radio_endpoint_params == other.radio_endpoint_params
    }

    /// Validate playlist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }

        if let Some(browse_id) = &self.browse_id {
            if browse_id.trim().is_empty() {
                return Err("Playlist browse id cannot be blank".to_string());
            }
        }

        if let Some(count) = self.remote_song_count {
            if count < 0 {
                return Err("Remote song count cannot be negative".to_string());
            }
        }

        Ok(())
    }
}

// =============================================================================
// Link rows
// =============================================================================

/// Ordered playlist membership; positions are dense and 0-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlaylistSongMap {
    pub playlist_id: String,
    pub song_id: String,
    pub position: i32,
    /// Remote per-playlist edit token of this entry
    pub set_video_id: Option<String>,
}

/// Ordered artist credits of a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SongArtistMap {
    pub song_id: String,
    pub artist_id: String,
    pub position: i32,
}

/// Track listing of an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SongAlbumMap {
    pub song_id: String,
    pub album_id: String,
    pub position: i32,
}

/// Ordered artist credits of an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AlbumArtistMap {
    pub album_id: String,
    pub artist_id: String,
    pub position: i32,
}
