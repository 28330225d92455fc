//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use textbook_core::model::{ChapterId, LibraryError, OptionId, QuestionId, QuizId, SectionId};

/// Errors emitted by `ProgressLedger`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),
    #[error("unknown chapter: {0}")]
    UnknownChapter(ChapterId),
    #[error("section {section} belongs to chapter {actual}, not {expected}")]
    ChapterMismatch {
        section: SectionId,
        expected: ChapterId,
        actual: ChapterId,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by quiz sessions and the quiz runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz not found: {0}")]
    QuizNotFound(QuizId),
    #[error("quiz session already started")]
    AlreadyStarted,
    #[error("quiz session is not in progress")]
    NotInProgress,
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("option {option} is not an answer to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
    #[error("no quiz is running")]
    NoActiveQuiz,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentService` and `GlossaryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while parsing or importing a content catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] textbook_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BookmarkService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookmarkError {
    #[error("already bookmarked")]
    AlreadyBookmarked,
    #[error(transparent)]
    Invalid(#[from] LibraryError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for BookmarkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => BookmarkError::AlreadyBookmarked,
            other => BookmarkError::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
