#![forbid(unsafe_code)]

pub mod app_services;
pub mod bookmark_service;
pub mod catalog;
pub mod content_service;
pub mod error;
pub mod glossary_service;
pub mod progress_ledger;
pub mod quiz;

pub use textbook_core::Clock;

pub use app_services::AppServices;
pub use bookmark_service::BookmarkService;
pub use catalog::Catalog;
pub use content_service::{ChapterOutline, ContentService, ImportSummary};
pub use error::{
    AppServicesError, BookmarkError, CatalogError, ContentError, ProgressError, QuizError,
};
pub use glossary_service::GlossaryService;
pub use progress_ledger::{ProgressLedger, ProgressUpdate};
pub use quiz::{
    FinishTrigger, QuizResultsService, QuizReview, QuizRunner, QuizSession, QuizSessionService,
    QuizState, RunnerEvent, TimerEvent,
};
