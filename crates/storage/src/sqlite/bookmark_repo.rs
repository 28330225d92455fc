use textbook_core::model::{Bookmark, BookmarkTarget};

use super::SqliteRepository;
use super::mapping::{conn, map_bookmark_row};
use crate::repository::{BookmarkRepository, StorageError};

#[async_trait::async_trait]
impl BookmarkRepository for SqliteRepository {
    async fn add_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO bookmarks (kind, target_id, label, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(kind, target_id) DO NOTHING
            ",
        )
        .bind(bookmark.target().kind())
        .bind(bookmark.target().id())
        .bind(bookmark.label())
        .bind(bookmark.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn remove_bookmark(&self, target: &BookmarkTarget) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM bookmarks WHERE kind = ?1 AND target_id = ?2")
            .bind(target.kind())
            .bind(target.id())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_bookmark(
        &self,
        target: &BookmarkTarget,
    ) -> Result<Option<Bookmark>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT kind, target_id, label, created_at
            FROM bookmarks WHERE kind = ?1 AND target_id = ?2
            ",
        )
        .bind(target.kind())
        .bind(target.id())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_bookmark_row).transpose()
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT kind, target_id, label, created_at
            FROM bookmarks
            ORDER BY created_at DESC, rowid DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_bookmark_row).collect()
    }
}
