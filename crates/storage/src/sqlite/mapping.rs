use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use textbook_core::model::{
    Bookmark, BookmarkTarget, Chapter, ChapterId, GlossaryTerm, QuizId, QuizResult,
    ReadingPosition, Section, SectionId, TermId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_percent(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn chapter_id(raw: String) -> Result<ChapterId, StorageError> {
    ChapterId::new(raw).map_err(ser)
}

fn section_id(raw: String) -> Result<SectionId, StorageError> {
    SectionId::new(raw).map_err(ser)
}

pub(crate) fn map_chapter_row(row: &SqliteRow) -> Result<Chapter, StorageError> {
    Chapter::from_persisted(
        chapter_id(row.try_get("id").map_err(ser)?)?,
        i64_to_u32("position", row.try_get("position").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        i64_to_percent("progress", row.try_get("progress").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<Section, StorageError> {
    Section::from_persisted(
        section_id(row.try_get("id").map_err(ser)?)?,
        chapter_id(row.try_get("chapter_id").map_err(ser)?)?,
        i64_to_u32("position", row.try_get("position").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get::<i64, _>("is_read").map_err(ser)? != 0,
        i64_to_percent("progress", row.try_get("progress").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_position_row(row: &SqliteRow) -> Result<ReadingPosition, StorageError> {
    Ok(ReadingPosition {
        chapter_id: chapter_id(row.try_get("chapter_id").map_err(ser)?)?,
        section_id: section_id(row.try_get("section_id").map_err(ser)?)?,
        scroll_position: row.try_get("scroll_position").map_err(ser)?,
        saved_at: row.try_get("saved_at").map_err(ser)?,
    })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<QuizResult, StorageError> {
    let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;
    Ok(QuizResult {
        quiz_id: QuizId::new(row.try_get::<String, _>("quiz_id").map_err(ser)?).map_err(ser)?,
        score: i64_to_percent("score", row.try_get("score").map_err(ser)?)?,
        time_taken_seconds: i64_to_u64(
            "time_taken_seconds",
            row.try_get("time_taken_seconds").map_err(ser)?,
        )?,
        completed_at,
        answered_questions: i64_to_u32(
            "answered_questions",
            row.try_get("answered_questions").map_err(ser)?,
        )?,
        correct_answers: i64_to_u32(
            "correct_answers",
            row.try_get("correct_answers").map_err(ser)?,
        )?,
        total_questions: i64_to_u32(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_bookmark_row(row: &SqliteRow) -> Result<Bookmark, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    let target_id: String = row.try_get("target_id").map_err(ser)?;
    let target = BookmarkTarget::from_parts(&kind, &target_id).map_err(ser)?;
    Bookmark::new(
        target,
        row.try_get::<String, _>("label").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_term_row(row: &SqliteRow) -> Result<GlossaryTerm, StorageError> {
    GlossaryTerm::new(
        TermId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?,
        row.try_get::<String, _>("term").map_err(ser)?,
        row.try_get::<String, _>("definition").map_err(ser)?,
        row.try_get::<Option<String>, _>("chapter_id")
            .map_err(ser)?
            .map(chapter_id)
            .transpose()?,
    )
    .map_err(ser)
}
