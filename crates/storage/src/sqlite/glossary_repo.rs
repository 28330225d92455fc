use textbook_core::model::{ChapterId, GlossaryTerm, TermId};

use super::SqliteRepository;
use super::mapping::{conn, map_term_row};
use crate::repository::{GlossaryRepository, StorageError};

#[async_trait::async_trait]
impl GlossaryRepository for SqliteRepository {
    async fn upsert_term(&self, term: &GlossaryTerm) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO glossary_terms (id, term, definition, chapter_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                term = excluded.term,
                definition = excluded.definition,
                chapter_id = excluded.chapter_id
            ",
        )
        .bind(term.id().as_str())
        .bind(term.term())
        .bind(term.definition())
        .bind(term.chapter_id().map(ChapterId::as_str))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_term(&self, id: &TermId) -> Result<Option<GlossaryTerm>, StorageError> {
        let row = sqlx::query(
            "SELECT id, term, definition, chapter_id FROM glossary_terms WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_term_row).transpose()
    }

    async fn list_terms(&self) -> Result<Vec<GlossaryTerm>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, term, definition, chapter_id FROM glossary_terms ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_term_row).collect()
    }
}
