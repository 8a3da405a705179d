//! # Remote Collection Reader
//!
//! The interface the reconciliation core needs from the remote service,
//! plus the remote item model it returns. Paging, authentication and wire
//! formats stay inside the implementation.
//!
//! Listings are heterogeneous. Each flow keeps the items of one
//! [`RemoteItemKind`] and ignores the rest.

use crate::error::RemoteError;
use async_trait::async_trait;
use core_library::{Album, Artist, Playlist, Song};
use serde::{Deserialize, Serialize};

/// Reads collections and detail pages from the remote service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// List every item of a library collection, most recent first
    ///
    /// # Arguments
    /// * `browse_id` - Collection identifier
    /// * `tab` - Optional sub-tab of the collection
    async fn library_items(
        &self,
        browse_id: &str,
        tab: Option<u32>,
    ) -> Result<Vec<RemoteItem>, RemoteError>;

    /// Fetch a playlist with its full song list
    async fn playlist(&self, browse_id: &str) -> Result<RemotePlaylistPage, RemoteError>;

    /// Fetch an album with its track listing
    async fn album(&self, browse_id: &str) -> Result<RemoteAlbumPage, RemoteError>;
}

/// Kind tag used to pick items out of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteItemKind {
    Song,
    Album,
    Artist,
    Playlist,
}

/// An entry of a remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteItem {
    Song(RemoteSong),
    Album(RemoteAlbum),
    Artist(RemoteArtist),
    Playlist(RemotePlaylist),
}

impl RemoteItem {
    pub fn kind(&self) -> RemoteItemKind {
        match self {
            RemoteItem::Song(_) => RemoteItemKind::Song,
            RemoteItem::Album(_) => RemoteItemKind::Album,
            RemoteItem::Artist(_) => RemoteItemKind::Artist,
            RemoteItem::Playlist(_) => RemoteItemKind::Playlist,
        }
    }

    /// Remote identifier of the item
    pub fn id(&self) -> &str {
        match self {
            RemoteItem::Song(song) => &song.id,
            RemoteItem::Album(album) => &album.browse_id,
            RemoteItem::Artist(artist) => &artist.id,
            RemoteItem::Playlist(playlist) => &playlist.id,
        }
    }

    pub fn into_song(self) -> Option<RemoteSong> {
        match self {
            RemoteItem::Song(song) => Some(song),
            _ => None,
        }
    }

    pub fn into_album(self) -> Option<RemoteAlbum> {
        match self {
            RemoteItem::Album(album) => Some(album),
            _ => None,
        }
    }

    pub fn into_artist(self) -> Option<RemoteArtist> {
        match self {
            RemoteItem::Artist(artist) => Some(artist),
            _ => None,
        }
    }

    pub fn into_playlist(self) -> Option<RemotePlaylist> {
        match self {
            RemoteItem::Playlist(playlist) => Some(playlist),
            _ => None,
        }
    }
}

/// Artist credit as it appears on songs and albums
///
/// Credits without an id are plain text and cannot be linked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtistRef {
    pub id: Option<String>,
    pub name: String,
}

impl RemoteArtistRef {
    /// Local artist row for a linkable credit
    pub fn to_artist(&self) -> Option<Artist> {
        let id = self.id.as_deref()?;
        Some(Artist::new(id, label_or_id(&self.name, id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAlbumRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSong {
    pub id: String,
    pub title: String,
    pub artists: Vec<RemoteArtistRef>,
    pub album: Option<RemoteAlbumRef>,
    /// Duration in seconds
    pub duration: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub explicit: bool,
    /// Per-playlist edit token; only present in playlist listings
    pub set_video_id: Option<String>,
}

impl RemoteSong {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            album: None,
            duration: None,
            thumbnail_url: None,
            explicit: false,
            set_video_id: None,
        }
    }

    /// Local song row with no flags set
    pub fn to_song(&self) -> Song {
        let mut song = Song::new(&self.id, label_or_id(&self.title, &self.id));
        song.duration = self.duration;
        song.thumbnail_url = self.thumbnail_url.clone();
        song.album_id = self.album.as_ref().map(|a| a.id.clone());
        song.album_name = self.album.as_ref().map(|a| a.name.clone());
        song.explicit = self.explicit;
        song
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAlbum {
    pub browse_id: String,
    /// Playlist that plays the album
    pub playlist_id: Option<String>,
    pub title: String,
    pub artists: Vec<RemoteArtistRef>,
    pub year: Option<i32>,
    pub thumbnail_url: Option<String>,
}

impl RemoteAlbum {
    pub fn new(browse_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            browse_id: browse_id.into(),
            playlist_id: None,
            title: title.into(),
            artists: Vec::new(),
            year: None,
            thumbnail_url: None,
        }
    }

    pub fn to_album(&self) -> Album {
        let mut album = Album::new(&self.browse_id, label_or_id(&self.title, &self.browse_id));
        album.playlist_id = self.playlist_id.clone();
        album.year = self.year;
        album.thumbnail_url = self.thumbnail_url.clone();
        album
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtist {
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub channel_id: Option<String>,
}

impl RemoteArtist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail_url: None,
            channel_id: None,
        }
    }

    pub fn to_artist(&self) -> Artist {
        let mut artist = Artist::new(&self.id, label_or_id(&self.name, &self.id));
        artist.thumbnail_url = self.thumbnail_url.clone();
        artist.channel_id = self.channel_id.clone();
        artist
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    /// Remote browse id, stored locally as `Playlist::browse_id`
    pub id: String,
    pub title: String,
    /// Free-form count text such as "1,024 songs"
    pub song_count_text: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_editable: bool,
    pub play_endpoint_params: Option<String>,
    pub shuffle_endpoint_params: Option<String>,
    pub radio_endpoint_params: Option<String>,
}

impl RemotePlaylist {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            song_count_text: None,
            thumbnail_url: None,
            is_editable: false,
            play_endpoint_params: None,
            shuffle_endpoint_params: None,
            radio_endpoint_params: None,
        }
    }

    /// First run of digits in the count text
    pub fn remote_song_count(&self) -> Option<i32> {
        let text = self.song_count_text.as_deref()?;
        let digits: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Copy the remote-derived fields onto `playlist`
    pub fn apply_to(&self, playlist: &mut Playlist) {
        playlist.name = label_or_id(&self.title, &self.id).to_string();
        playlist.browse_id = Some(self.id.clone());
        playlist.is_editable = self.is_editable;
        playlist.remote_song_count = self.remote_song_count();
        playlist.play_endpoint_params = self.play_endpoint_params.clone();
        playlist.shuffle_endpoint_params = self.shuffle_endpoint_params.clone();
        playlist.radio_endpoint_params = self.radio_endpoint_params.clone();
    }

    /// New local playlist mirroring this one
    pub fn to_playlist(&self) -> Playlist {
        let mut playlist = Playlist::remote(label_or_id(&self.title, &self.id), &self.id);
        self.apply_to(&mut playlist);
        playlist
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaylistPage {
    pub playlist: RemotePlaylist,
    /// Songs in playlist order
    pub songs: Vec<RemoteSong>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAlbumPage {
    pub album: RemoteAlbum,
    /// Tracks in album order
    pub songs: Vec<RemoteSong>,
}

/// The remote service sometimes returns blank titles and names; the id
/// stands in so the row can still be stored.
fn label_or_id<'a>(label: &'a str, id: &'a str) -> &'a str {
    if label.trim().is_empty() {
        id
    } else {
        label
    }
}
