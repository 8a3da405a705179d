//! Song queries
//!
//! Every function takes any SQLite executor so the same statements run
//! against the pool for reads and against an open transaction for writes.

use crate::error::{LibraryError, Result};
use crate::models::{Artist, Song, SongAlbumMap, SongArtistMap};
use sqlx::{query, query_as, SqliteExecutor};

pub(crate) async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Song>>
where
    E: SqliteExecutor<'e>,
{
    let song = query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(song)
}

pub(crate) async fn liked<'e, E>(executor: E) -> Result<Vec<Song>>
where
    E: SqliteExecutor<'e>,
{
    let songs = query_as::<_, Song>(
        "SELECT * FROM songs WHERE liked = 1 ORDER BY title COLLATE NOCASE, id",
    )
    .fetch_all(executor)
    .await?;

    Ok(songs)
}

pub(crate) async fn in_library<'e, E>(executor: E) -> Result<Vec<Song>>
where
    E: SqliteExecutor<'e>,
{
    let songs = query_as::<_, Song>(
        "SELECT * FROM songs WHERE in_library IS NOT NULL ORDER BY title COLLATE NOCASE, id",
    )
    .fetch_all(executor)
    .await?;

    Ok(songs)
}

pub(crate) async fn liked_not_downloaded<'e, E>(executor: E) -> Result<Vec<Song>>
where
    E: SqliteExecutor<'e>,
{
    let songs = query_as::<_, Song>(
        r#"
        SELECT * FROM songs
        WHERE liked = 1 AND downloaded_at IS NULL
        ORDER BY title COLLATE NOCASE, id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(songs)
}

/// Songs of an album in track order
pub(crate) async fn by_album<'e, E>(executor: E, album_id: &str) -> Result<Vec<Song>>
where
    E: SqliteExecutor<'e>,
{
    let songs = query_as::<_, Song>(
        r#"
        SELECT s.* FROM songs s
        INNER JOIN song_album_map m ON m.song_id = s.id
        WHERE m.album_id = ?
        ORDER BY m.position
        "#,
    )
    .bind(album_id)
    .fetch_all(executor)
    .await?;

    Ok(songs)
}

/// Artists credited on a song in credit order
pub(crate) async fn artists<'e, E>(executor: E, song_id: &str) -> Result<Vec<Artist>>
where
    E: SqliteExecutor<'e>,
{
    let artists = query_as::<_, Artist>(
        r#"
        SELECT a.* FROM artists a
        INNER JOIN song_artist_map m ON m.artist_id = a.id
        WHERE m.song_id = ?
        ORDER BY m.position
        "#,
    )
    .bind(song_id)
    .fetch_all(executor)
    .await?;

    Ok(artists)
}

/// Insert `song` unless a row with its id exists
pub(crate) async fn insert_if_absent<'e, E>(executor: E, song: &Song) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    song.validate()
        .map_err(|e| LibraryError::invalid("Song", e))?;

    let result = query(
        r#"
        INSERT INTO songs (
            id, title, duration, thumbnail_url, album_id, album_name, explicit,
            liked, liked_at, in_library, downloaded_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&song.id)
    .bind(&song.title)
    .bind(song.duration)
    .bind(&song.thumbnail_url)
    .bind(&song.album_id)
    .bind(&song.album_name)
    .bind(song.explicit)
    .bind(song.liked)
    .bind(song.liked_at)
    .bind(song.in_library)
    .bind(song.downloaded_at)
    .bind(song.created_at)
    .bind(song.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn link_artist<'e, E>(executor: E, link: &SongArtistMap) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    query(
        r#"
        INSERT INTO song_artist_map (song_id, artist_id, position)
        VALUES (?, ?, ?)
        ON CONFLICT(song_id, artist_id) DO NOTHING
        "#,
    )
    .bind(&link.song_id)
    .bind(&link.artist_id)
    .bind(link.position)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn link_album<'e, E>(executor: E, link: &SongAlbumMap) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    query(
        r#"
        INSERT INTO song_album_map (song_id, album_id, position)
        VALUES (?, ?, ?)
        ON CONFLICT(song_id, album_id) DO NOTHING
        "#,
    )
    .bind(&link.song_id)
    .bind(&link.album_id)
    .bind(link.position)
    .execute(executor)
    .await?;

    Ok(())
}
