pub mod content;
pub mod media;

pub use media::{MediaSource, MediaValidationError};

pub use content::{ContentBlock, ContentValidationError, SectionContent};
