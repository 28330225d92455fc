use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::bookmark_service::BookmarkService;
use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::glossary_service::GlossaryService;
use crate::progress_ledger::ProgressLedger;
use crate::quiz::{QuizResultsService, QuizRunner, QuizSessionService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    ledger: Arc<ProgressLedger>,
    quiz_sessions: Arc<QuizSessionService>,
    quiz_results: Arc<QuizResultsService>,
    content: Arc<ContentService>,
    bookmarks: Arc<BookmarkService>,
    glossary: Arc<GlossaryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            ledger: Arc::new(ProgressLedger::new(
                clock,
                Arc::clone(&storage.content),
                Arc::clone(&storage.progress),
            )),
            quiz_sessions: Arc::new(QuizSessionService::new(clock, Arc::clone(&storage.quizzes))),
            quiz_results: Arc::new(QuizResultsService::new(Arc::clone(&storage.quizzes))),
            content: Arc::new(ContentService::new(
                Arc::clone(&storage.content),
                Arc::clone(&storage.quizzes),
                Arc::clone(&storage.glossary),
            )),
            bookmarks: Arc::new(BookmarkService::new(clock, Arc::clone(&storage.bookmarks))),
            glossary: Arc::new(GlossaryService::new(Arc::clone(&storage.glossary))),
        }
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<ProgressLedger> {
        Arc::clone(&self.ledger)
    }

    #[must_use]
    pub fn quiz_sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz_sessions)
    }

    /// A fresh runner driving timed attempts through the shared session service.
    #[must_use]
    pub fn quiz_runner(&self) -> QuizRunner {
        QuizRunner::new(Arc::clone(&self.quiz_sessions))
    }

    #[must_use]
    pub fn quiz_results(&self) -> Arc<QuizResultsService> {
        Arc::clone(&self.quiz_results)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn bookmarks(&self) -> Arc<BookmarkService> {
        Arc::clone(&self.bookmarks)
    }

    #[must_use]
    pub fn glossary(&self) -> Arc<GlossaryService> {
        Arc::clone(&self.glossary)
    }
}
