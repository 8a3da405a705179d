//! Artist queries

use crate::error::{LibraryError, Result};
use crate::models::Artist;
use sqlx::{query, query_as, SqliteExecutor};

pub(crate) async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Artist>>
where
    E: SqliteExecutor<'e>,
{
    let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(artist)
}

/// Subscribed artists ordered by name
pub(crate) async fn bookmarked<'e, E>(executor: E) -> Result<Vec<Artist>>
where
    E: SqliteExecutor<'e>,
{
    let artists = query_as::<_, Artist>(
        "SELECT * FROM artists WHERE bookmarked_at IS NOT NULL ORDER BY name COLLATE NOCASE, id",
    )
    .fetch_all(executor)
    .await?;

    Ok(artists)
}

/// Insert `artist` unless a row with its id exists
pub(crate) async fn insert_if_absent<'e, E>(executor: E, artist: &Artist) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    artist
        .validate()
        .map_err(|e| LibraryError::invalid("Artist", e))?;

    let result = query(
        r#"
        INSERT INTO artists (
            id, name, thumbnail_url, channel_id, bookmarked_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&artist.id)
    .bind(&artist.name)
    .bind(&artist.thumbnail_url)
    .bind(&artist.channel_id)
    .bind(artist.bookmarked_at)
    .bind(artist.created_at)
    .bind(artist.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
