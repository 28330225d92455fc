use sqlx::Row;
use textbook_core::model::{ChapterId, ReadingPosition};

use super::SqliteRepository;
use super::mapping::{conn, i64_to_percent, map_position_row, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn overall_progress(&self) -> Result<u8, StorageError> {
        let row = sqlx::query("SELECT overall_progress FROM app_progress WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => i64_to_percent(
                "overall_progress",
                row.try_get("overall_progress").map_err(ser)?,
            ),
            None => Ok(0),
        }
    }

    async fn set_overall_progress(&self, progress: u8) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO app_progress (id, overall_progress)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET overall_progress = excluded.overall_progress
            ",
        )
        .bind(i64::from(progress))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn save_reading_position(
        &self,
        position: &ReadingPosition,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO reading_positions (chapter_id, section_id, scroll_position, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(chapter_id) DO UPDATE SET
                section_id = excluded.section_id,
                scroll_position = excluded.scroll_position,
                saved_at = excluded.saved_at
            ",
        )
        .bind(position.chapter_id.as_str())
        .bind(position.section_id.as_str())
        .bind(position.scroll_position)
        .bind(position.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn last_read_position(
        &self,
        chapter: &ChapterId,
    ) -> Result<Option<ReadingPosition>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT chapter_id, section_id, scroll_position, saved_at
            FROM reading_positions WHERE chapter_id = ?1
            ",
        )
        .bind(chapter.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_position_row).transpose()
    }
}
