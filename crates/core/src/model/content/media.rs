use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("Media source cannot be empty.")]
    EmptySource,

    #[error("Media URL is invalid: {0}")]
    InvalidUrl(String),
}

//
// ─── MEDIA SOURCE ──────────────────────────────────────────────────────────────
//

/// Where an image, video or diagram is loaded from.
///
/// Anything with a scheme is parsed as a URL; everything else is a bundled
/// asset path relative to the book's asset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaSource {
    Asset(String),
    Url(Url),
}

impl MediaSource {
    /// Parse a media reference.
    ///
    /// # Errors
    ///
    /// Returns `MediaValidationError` if the value is blank or a malformed URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MediaValidationError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(MediaValidationError::EmptySource);
        }
        if s.contains("://") {
            let url = Url::parse(s).map_err(|_| MediaValidationError::InvalidUrl(s.to_owned()))?;
            return Ok(MediaSource::Url(url));
        }
        Ok(MediaSource::Asset(s.to_owned()))
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Url(_))
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Asset(path) => f.write_str(path),
            MediaSource::Url(url) => f.write_str(url.as_str()),
        }
    }
}

impl TryFrom<String> for MediaSource {
    type Error = MediaValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MediaSource> for String {
    fn from(source: MediaSource) -> Self {
        source.to_string()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
