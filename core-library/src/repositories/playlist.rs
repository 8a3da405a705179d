//! Playlist queries

use crate::error::{LibraryError, Result};
use crate::models::{Playlist, PlaylistSongMap};
use sqlx::{query, query_as, SqliteExecutor};

pub(crate) async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Playlist>>
where
    E: SqliteExecutor<'e>,
{
    let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(playlist)
}

pub(crate) async fn find_by_browse_id<'e, E>(executor: E, browse_id: &str) -> Result<Option<Playlist>>
where
    E: SqliteExecutor<'e>,
{
    let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE browse_id = ?")
        .bind(browse_id)
        .fetch_optional(executor)
        .await?;

    Ok(playlist)
}

/// Every playlist ordered by name
pub(crate) async fn all<'e, E>(executor: E) -> Result<Vec<Playlist>>
where
    E: SqliteExecutor<'e>,
{
    let playlists =
        query_as::<_, Playlist>("SELECT * FROM playlists ORDER BY name COLLATE NOCASE, id")
            .fetch_all(executor)
            .await?;

    Ok(playlists)
}

pub(crate) async fn insert<'e, E>(executor: E, playlist: &Playlist) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    playlist
        .validate()
        .map_err(|e| LibraryError::invalid("Playlist", e))?;

    query(
        r#"
        INSERT INTO playlists (
            id, name, browse_id, is_editable, bookmarked_at, remote_song_count,
            play_endpoint_params, shuffle_endpoint_params, radio_endpoint_params,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&playlist.id)
    .bind(&playlist.name)
    .bind(&playlist.browse_id)
    .bind(playlist.is_editable)
    .bind(playlist.bookmarked_at)
    .bind(playlist.remote_song_count)
    .bind(&playlist.play_endpoint_params)
    .bind(&playlist.shuffle_endpoint_params)
    .bind(&playlist.radio_endpoint_params)
    .bind(playlist.created_at)
    .bind(playlist.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Overwrite remote-derived columns when at least one differs
///
/// `IS` compares NULLs as equal, so an unchanged row is never written.
pub(crate) async fn update_metadata<'e, E>(executor: E, playlist: &Playlist) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    playlist
        .validate()
        .map_err(|e| LibraryError::invalid("Playlist", e))?;

    let result = query(
        r#"
        UPDATE playlists
        SET name = ?, browse_id = ?, is_editable = ?, remote_song_count = ?,
            play_endpoint_params = ?, shuffle_endpoint_params = ?,
            radio_endpoint_params = ?, updated_at = ?
        WHERE id = ?
          AND NOT (
            name IS ? AND browse_id IS ? AND is_editable IS ?
            AND remote_song_count IS ? AND play_endpoint_params IS ?
            AND shuffle_endpoint_params IS ? AND radio_endpoint_params IS ?
          )
        "#,
    )
    .bind(&playlist.name)
    .bind(&playlist.browse_id)
    .bind(playlist.is_editable)
    .bind(playlist.remote_song_count)
    .bind(&playlist.play_endpoint_params)
    .bind(&playlist.shuffle_endpoint_params)
    .bind(&playlist.radio_endpoint_params)
    .bind(playlist.updated_at)
    .bind(&playlist.id)
    .bind(&playlist.name)
    .bind(&playlist.browse_id)
    .bind(playlist.is_editable)
    .bind(playlist.remote_song_count)
    .bind(&playlist.play_endpoint_params)
    .bind(&playlist.shuffle_endpoint_params)
    .bind(&playlist.radio_endpoint_params)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Membership rows ordered by position
pub(crate) async fn songs<'e, E>(executor: E, playlist_id: &str) -> Result<Vec<PlaylistSongMap>>
where
    E: SqliteExecutor<'e>,
{
    let entries = query_as::<_, PlaylistSongMap>(
        r#"
        SELECT playlist_id, song_id, position, set_video_id
        FROM playlist_song_map
        WHERE playlist_id = ?
        ORDER BY position
        "#,
    )
    .bind(playlist_id)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}

pub(crate) async fn clear_songs<'e, E>(executor: E, playlist_id: &str) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = query("DELETE FROM playlist_song_map WHERE playlist_id = ?")
        .bind(playlist_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn insert_song<'e, E>(executor: E, entry: &PlaylistSongMap) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    if entry.position < 0 {
        return Err(LibraryError::invalid(
            "position",
            format!("must not be negative, got {}", entry.position),
        ));
    }

    query(
        r#"
        INSERT INTO playlist_song_map (playlist_id, song_id, position, set_video_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&entry.playlist_id)
    .bind(&entry.song_id)
    .bind(entry.position)
    .bind(&entry.set_video_id)
    .execute(executor)
    .await?;

    Ok(())
}
