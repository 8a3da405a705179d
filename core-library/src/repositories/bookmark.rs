//! Field-targeted bookmark writes
//!
//! Each statement touches a single bookmark column and is guarded by its
//! current state, so a no-op mark or unmark performs no write at all.

use crate::error::Result;
use crate::models::{now_timestamp, BookmarkKind};
use sqlx::{query, SqliteExecutor};

fn mark_statement(kind: BookmarkKind) -> &'static str {
    match kind {
        BookmarkKind::LikedSong => {
            "UPDATE songs SET liked = 1, liked_at = ?, updated_at = ? WHERE id = ? AND liked = 0"
        }
        BookmarkKind::LibrarySong => {
            "UPDATE songs SET in_library = ?, updated_at = ? WHERE id = ? AND in_library IS NULL"
        }
        BookmarkKind::Album => {
            "UPDATE albums SET bookmarked_at = ?, updated_at = ? WHERE id = ? AND bookmarked_at IS NULL"
        }
        BookmarkKind::Artist => {
            "UPDATE artists SET bookmarked_at = ?, updated_at = ? WHERE id = ? AND bookmarked_at IS NULL"
        }
        BookmarkKind::Playlist => {
            "UPDATE playlists SET bookmarked_at = ?, updated_at = ? WHERE id = ? AND bookmarked_at IS NULL"
        }
    }
}

fn unmark_statement(kind: BookmarkKind) -> &'static str {
    match kind {
        BookmarkKind::LikedSong => {
            "UPDATE songs SET liked = 0, liked_at = NULL, updated_at = ? WHERE id = ? AND liked = 1"
        }
        BookmarkKind::LibrarySong => {
            "UPDATE songs SET in_library = NULL, updated_at = ? WHERE id = ? AND in_library IS NOT NULL"
        }
        BookmarkKind::Album => {
            "UPDATE albums SET bookmarked_at = NULL, updated_at = ? WHERE id = ? AND bookmarked_at IS NOT NULL"
        }
        BookmarkKind::Artist => {
            "UPDATE artists SET bookmarked_at = NULL, updated_at = ? WHERE id = ? AND bookmarked_at IS NOT NULL"
        }
        BookmarkKind::Playlist => {
            "UPDATE playlists SET bookmarked_at = NULL, updated_at = ? WHERE id = ? AND bookmarked_at IS NOT NULL"
        }
    }
}

pub(crate) async fn mark<'e, E>(executor: E, kind: BookmarkKind, id: &str, at: i64) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = query(mark_statement(kind))
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn unmark<'e, E>(executor: E, kind: BookmarkKind, id: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = query(unmark_statement(kind))
        .bind(now_timestamp())
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{Album, Song};
    use crate::repositories::{album, song};

    #[tokio::test]
    async fn test_mark_is_conditional() {
        let pool = create_test_pool().await.unwrap();
        album::insert_if_absent(&pool, &Album::new("MPREb_1", "Album"))
            .await
            .unwrap();

        assert!(mark(&pool, BookmarkKind::Album, "MPREb_1", 100).await.unwrap());
        assert!(!mark(&pool, BookmarkKind::Album, "MPREb_1", 200).await.unwrap());

        let found = album::find_by_id(&pool, "MPREb_1").await.unwrap().unwrap();
        assert_eq!(found.bookmarked_at, Some(100));

        assert!(unmark(&pool, BookmarkKind::Album, "MPREb_1").await.unwrap());
        assert!(!unmark(&pool, BookmarkKind::Album, "MPREb_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_song_bookmarks_are_independent() {
        let pool = create_test_pool().await.unwrap();
        song::insert_if_absent(&pool, &Song::new("v1", "Song"))
            .await
            .unwrap();

        assert!(mark(&pool, BookmarkKind::LikedSong, "v1", 10).await.unwrap());
        assert!(mark(&pool, BookmarkKind::LibrarySong, "v1", 20).await.unwrap());
        assert!(unmark(&pool, BookmarkKind::LikedSong, "v1").await.unwrap());

        let found = song::find_by_id(&pool, "v1").await.unwrap().unwrap();
        assert!(!found.liked);
        assert_eq!(found.liked_at, None);
        assert_eq!(found.in_library, Some(20));
    }

    #[tokio::test]
    async fn test_missing_row_is_not_marked() {
        let pool = create_test_pool().await.unwrap();
        for kind in BookmarkKind::ALL {
            assert!(!mark(&pool, kind, "missing", 1).await.unwrap());
            assert!(!unmark(&pool, kind, "missing").await.unwrap());
        }
    }
}
