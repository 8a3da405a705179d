//! Album queries

use crate::error::{LibraryError, Result};
use crate::models::{Album, AlbumArtistMap};
use sqlx::{query, query_as, SqliteExecutor};

pub(crate) async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Album>>
where
    E: SqliteExecutor<'e>,
{
    let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(album)
}

/// Saved albums ordered by title
pub(crate) async fn bookmarked<'e, E>(executor: E) -> Result<Vec<Album>>
where
    E: SqliteExecutor<'e>,
{
    let albums = query_as::<_, Album>(
        "SELECT * FROM albums WHERE bookmarked_at IS NOT NULL ORDER BY title COLLATE NOCASE, id",
    )
    .fetch_all(executor)
    .await?;

    Ok(albums)
}

/// Insert `album` unless a row with its id exists
pub(crate) async fn insert_if_absent<'e, E>(executor: E, album: &Album) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    album
        .validate()
        .map_err(|e| LibraryError::invalid("Album", e))?;

    let result = query(
        r#"
        INSERT INTO albums (
            id, playlist_id, title, year, thumbnail_url, song_count, duration,
            bookmarked_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&album.id)
    .bind(&album.playlist_id)
    .bind(&album.title)
    .bind(album.year)
    .bind(&album.thumbnail_url)
    .bind(album.song_count)
    .bind(album.duration)
    .bind(album.bookmarked_at)
    .bind(album.created_at)
    .bind(album.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn link_artist<'e, E>(executor: E, link: &AlbumArtistMap) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    query(
        r#"
        INSERT INTO album_artist_map (album_id, artist_id, position)
        VALUES (?, ?, ?)
        ON CONFLICT(album_id, artist_id) DO NOTHING
        "#,
    )
    .bind(&link.album_id)
    .bind(&link.artist_id)
    .bind(link.position)
    .execute(executor)
    .await?;

    Ok(())
}
