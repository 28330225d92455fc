use sqlx::Row;
use textbook_core::model::{
    Chapter, ChapterId, ContentBlock, Section, SectionContent, SectionId,
};

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u64, map_chapter_row, map_section_row, ser};
use crate::repository::{ContentRepository, StorageError};

fn require_row(affected: u64) -> Result<(), StorageError> {
    if affected == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

impl SqliteRepository {
    async fn count(&self, sql: &str, chapter: Option<&ChapterId>) -> Result<u64, StorageError> {
        let mut query = sqlx::query(sql);
        if let Some(chapter) = chapter {
            query = query.bind(chapter.as_str());
        }
        let row = query.fetch_one(&self.pool).await.map_err(conn)?;
        i64_to_u64("count", row.try_get::<i64, _>(0).map_err(ser)?)
    }
}

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO chapters (id, position, title, description, progress)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                -- progress belongs to the reader, not to the imported outline
                position = excluded.position,
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(chapter.id().as_str())
        .bind(i64::from(chapter.order()))
        .bind(chapter.title())
        .bind(chapter.description())
        .bind(i64::from(chapter.progress()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        if self.get_chapter(section.chapter_id()).await?.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO sections (id, chapter_id, position, title, is_read, progress)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                chapter_id = excluded.chapter_id,
                position = excluded.position,
                title = excluded.title
            ",
        )
        .bind(section.id().as_str())
        .bind(section.chapter_id().as_str())
        .bind(i64::from(section.order()))
        .bind(section.title())
        .bind(i64::from(section.is_read()))
        .bind(i64::from(section.progress()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, position, title, description, progress
            FROM chapters WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_chapter_row).transpose()
    }

    async fn list_chapters(&self) -> Result<Vec<Chapter>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, position, title, description, progress
            FROM chapters
            ORDER BY position ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_chapter_row).collect()
    }

    async fn get_section(&self, id: &SectionId) -> Result<Option<Section>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, chapter_id, position, title, is_read, progress
            FROM sections WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_section_row).transpose()
    }

    async fn sections_for_chapter(
        &self,
        chapter: &ChapterId,
    ) -> Result<Vec<Section>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, chapter_id, position, title, is_read, progress
            FROM sections
            WHERE chapter_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(chapter.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_section_row).collect()
    }

    async fn set_section_content(&self, content: &SectionContent) -> Result<(), StorageError> {
        if self.get_section(&content.section_id).await?.is_none() {
            return Err(StorageError::NotFound);
        }
        let blocks_json = serde_json::to_string(&content.blocks).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO section_content (section_id, blocks_json)
            VALUES (?1, ?2)
            ON CONFLICT(section_id) DO UPDATE SET blocks_json = excluded.blocks_json
            ",
        )
        .bind(content.section_id.as_str())
        .bind(blocks_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn section_content(
        &self,
        id: &SectionId,
    ) -> Result<Option<SectionContent>, StorageError> {
        let row = sqlx::query("SELECT blocks_json FROM section_content WHERE section_id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("blocks_json").map_err(ser)?;
        let blocks: Vec<ContentBlock> = serde_json::from_str(&raw).map_err(ser)?;
        SectionContent::new(id.clone(), blocks).map(Some).map_err(ser)
    }

    async fn set_section_read(&self, id: &SectionId, read: bool) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE sections SET is_read = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(i64::from(read))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        require_row(res.rows_affected())
    }

    async fn set_section_progress(
        &self,
        id: &SectionId,
        progress: u8,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE sections SET progress = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(i64::from(progress))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        require_row(res.rows_affected())
    }

    async fn set_chapter_progress(
        &self,
        id: &ChapterId,
        progress: u8,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE chapters SET progress = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(i64::from(progress))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        require_row(res.rows_affected())
    }

    async fn total_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError> {
        self.count(
            "SELECT COUNT(*) FROM sections WHERE chapter_id = ?1",
            Some(chapter),
        )
        .await
    }

    async fn read_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError> {
        self.count(
            "SELECT COUNT(*) FROM sections WHERE chapter_id = ?1 AND is_read = 1",
            Some(chapter),
        )
        .await
    }

    async fn total_all_sections_count(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM sections", None).await
    }

    async fn total_read_sections_count(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM sections WHERE is_read = 1", None)
            .await
    }
}
