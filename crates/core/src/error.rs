use thiserror::Error;

use crate::model::{
    ContentValidationError, IdError, LibraryError, MediaValidationError, OutlineError,
    QuizDefinitionError,
};

/// Any validation failure raised while building domain values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error(transparent)]
    ContentValidation(#[from] ContentValidationError),
    #[error(transparent)]
    MediaValidation(#[from] MediaValidationError),
    #[error(transparent)]
    Quiz(#[from] QuizDefinitionError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}
