use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ChapterId, SectionId, TermId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("glossary term cannot be empty")]
    EmptyTerm,

    #[error("glossary definition cannot be empty")]
    EmptyDefinition,

    #[error("bookmark label cannot be empty")]
    EmptyLabel,

    #[error("unknown bookmark kind: {0}")]
    UnknownBookmarkKind(String),
}

//
// ─── READING POSITION ──────────────────────────────────────────────────────────
//

/// Last place the reader was in a chapter. The scroll offset is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingPosition {
    pub chapter_id: ChapterId,
    pub section_id: SectionId,
    pub scroll_position: i64,
    pub saved_at: DateTime<Utc>,
}

//
// ─── BOOKMARKS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookmarkTarget {
    Section(SectionId),
    Term(TermId),
}

impl BookmarkTarget {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BookmarkTarget::Section(_) => "section",
            BookmarkTarget::Term(_) => "term",
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            BookmarkTarget::Section(id) => id.as_str(),
            BookmarkTarget::Term(id) => id.as_str(),
        }
    }

    /// Rebuild a target from its `(kind, id)` storage pair.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::UnknownBookmarkKind` for an unknown kind; blank ids
    /// are reported the same way since they cannot name a target.
    pub fn from_parts(kind: &str, id: &str) -> Result<Self, LibraryError> {
        let unknown = || LibraryError::UnknownBookmarkKind(format!("{kind}:{id}"));
        match kind {
            "section" => SectionId::new(id)
                .map(BookmarkTarget::Section)
                .map_err(|_| unknown()),
            "term" => TermId::new(id).map(BookmarkTarget::Term).map_err(|_| unknown()),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for BookmarkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A saved reference to a section or glossary term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    target: BookmarkTarget,
    label: String,
    created_at: DateTime<Utc>,
}

impl Bookmark {
    /// # Errors
    ///
    /// Returns `LibraryError::EmptyLabel` if the label is blank.
    pub fn new(
        target: BookmarkTarget,
        label: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LibraryError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(LibraryError::EmptyLabel);
        }
        Ok(Self {
            target,
            label,
            created_at,
        })
    }

    #[must_use]
    pub fn target(&self) -> &BookmarkTarget {
        &self.target
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── GLOSSARY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryTerm {
    id: TermId,
    term: String,
    definition: String,
    chapter_id: Option<ChapterId>,
}

/// How well a term matched a search query. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TermMatch {
    Prefix,
    InTerm,
    InDefinition,
}

impl GlossaryTerm {
    /// # Errors
    ///
    /// Returns `LibraryError` if the term or definition is blank.
    pub fn new(
        id: TermId,
        term: impl Into<String>,
        definition: impl Into<String>,
        chapter_id: Option<ChapterId>,
    ) -> Result<Self, LibraryError> {
        let term = term.into();
        let definition = definition.into();
        if term.trim().is_empty() {
            return Err(LibraryError::EmptyTerm);
        }
        if definition.trim().is_empty() {
            return Err(LibraryError::EmptyDefinition);
        }
        Ok(Self {
            id,
            term,
            definition,
            chapter_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TermId {
        &self.id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn chapter_id(&self) -> Option<&ChapterId> {
        self.chapter_id.as_ref()
    }

    /// Case-insensitive match against an already lowercased query.
    #[must_use]
    pub fn matches(&self, query_lower: &str) -> Option<TermMatch> {
        let term = self.term.to_lowercase();
        if term.starts_with(query_lower) {
            Some(TermMatch::Prefix)
        } else if term.contains(query_lower) {
            Some(TermMatch::InTerm)
        } else if self.definition.to_lowercase().contains(query_lower) {
            Some(TermMatch::InDefinition)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn term(name: &str, definition: &str) -> GlossaryTerm {
        GlossaryTerm::new(TermId::new(name).unwrap(), name, definition, None).unwrap()
    }

    #[test]
    fn bookmark_target_round_trips_parts() {
        let target = BookmarkTarget::Section(SectionId::new("s2-1").unwrap());
        let back = BookmarkTarget::from_parts(target.kind(), target.id()).unwrap();
        assert_eq!(back, target);
        assert_eq!(target.to_string(), "section:s2-1");
    }

    #[test]
    fn unknown_bookmark_kind_fails() {
        let err = BookmarkTarget::from_parts("figure", "f1").unwrap_err();
        assert_eq!(err, LibraryError::UnknownBookmarkKind("figure:f1".into()));
    }

    #[test]
    fn blank_label_fails() {
        let target = BookmarkTarget::Term(TermId::new("simd").unwrap());
        let err = Bookmark::new(target, " ", fixed_now()).unwrap_err();
        assert_eq!(err, LibraryError::EmptyLabel);
    }

    #[test]
    fn term_match_ranks_prefix_first() {
        let t = term("Cache coherence", "Keeping cached copies consistent");
        assert_eq!(t.matches("cache"), Some(TermMatch::Prefix));
        assert_eq!(t.matches("coher"), Some(TermMatch::InTerm));
        assert_eq!(t.matches("consistent"), Some(TermMatch::InDefinition));
        assert_eq!(t.matches("warp"), None);
        assert!(TermMatch::Prefix < TermMatch::InDefinition);
    }

    #[test]
    fn blank_definition_fails() {
        let err = GlossaryTerm::new(TermId::new("t").unwrap(), "SIMD", "", None).unwrap_err();
        assert_eq!(err, LibraryError::EmptyDefinition);
    }
}
