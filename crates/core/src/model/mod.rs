mod attempt;
pub mod content;
mod ids;
mod library;
mod outline;
mod quiz;

pub use content::{
    ContentBlock, ContentValidationError, MediaSource, MediaValidationError, SectionContent,
};
pub use ids::{ChapterId, IdError, OptionId, QuestionId, QuizId, SectionId, TermId};

pub use attempt::{QuizResult, UserAnswerSet};
pub use library::{Bookmark, BookmarkTarget, GlossaryTerm, LibraryError, ReadingPosition, TermMatch};
pub use outline::{Chapter, OutlineError, Section};
pub use quiz::{
    Difficulty, QuestionKind, Quiz, QuizDefinitionError, QuizOption, QuizQuestion,
};
