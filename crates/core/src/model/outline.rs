use thiserror::Error;

use crate::model::ids::{ChapterId, SectionId};
use crate::progress::{COMPLETE, crosses_read_threshold};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutlineError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),
}

fn check_title(title: &str) -> Result<(), OutlineError> {
    if title.trim().is_empty() {
        Err(OutlineError::EmptyTitle)
    } else {
        Ok(())
    }
}

fn check_progress(progress: u8) -> Result<u8, OutlineError> {
    if progress > COMPLETE {
        Err(OutlineError::ProgressOutOfRange(progress))
    } else {
        Ok(progress)
    }
}

//
// ─── CHAPTER ───────────────────────────────────────────────────────────────────
//

/// An ordered group of sections.
///
/// `progress` is the last value written by the progress ledger: normally the
/// percentage of read sections, occasionally a scroll-based hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: ChapterId,
    order: u32,
    title: String,
    description: Option<String>,
    progress: u8,
}

impl Chapter {
    /// Creates a chapter with no progress.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ChapterId,
        order: u32,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, OutlineError> {
        let title = title.into();
        check_title(&title)?;
        Ok(Self {
            id,
            order,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            progress: 0,
        })
    }

    /// Rehydrate a chapter from storage.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError` if the title is blank or progress exceeds 100.
    pub fn from_persisted(
        id: ChapterId,
        order: u32,
        title: String,
        description: Option<String>,
        progress: u8,
    ) -> Result<Self, OutlineError> {
        let mut chapter = Self::new(id, order, title, description)?;
        chapter.progress = check_progress(progress)?;
        Ok(chapter)
    }

    #[must_use]
    pub fn id(&self) -> &ChapterId {
        &self.id
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETE
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// Smallest readable unit of the book. Belongs to exactly one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    chapter_id: ChapterId,
    order: u32,
    title: String,
    read: bool,
    progress: u8,
}

impl Section {
    /// Creates an unread section.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::EmptyTitle` if the title is blank.
    pub fn new(
        id: SectionId,
        chapter_id: ChapterId,
        order: u32,
        title: impl Into<String>,
    ) -> Result<Self, OutlineError> {
        let title = title.into();
        check_title(&title)?;
        Ok(Self {
            id,
            chapter_id,
            order,
            title,
            read: false,
            progress: 0,
        })
    }

    /// Rehydrate a section from storage.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError` if the title is blank or progress exceeds 100.
    pub fn from_persisted(
        id: SectionId,
        chapter_id: ChapterId,
        order: u32,
        title: String,
        read: bool,
        progress: u8,
    ) -> Result<Self, OutlineError> {
        let mut section = Self::new(id, chapter_id, order, title)?;
        section.read = read;
        section.progress = check_progress(progress)?;
        Ok(section)
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    #[must_use]
    pub fn chapter_id(&self) -> &ChapterId {
        &self.chapter_id
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        self.read
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Record a reading progress value (clamped to 100).
    ///
    /// Returns true if this call turned the section from unread to read.
    /// A read section never becomes unread again.
    pub fn record_progress(&mut self, progress: u8) -> bool {
        self.progress = progress.min(COMPLETE);
        if crosses_read_threshold(self.progress) && !self.read {
            self.read = true;
            return true;
        }
        false
    }

    /// Mark the section as read regardless of its progress value.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> Section {
        Section::new(
            SectionId::new("s1").unwrap(),
            ChapterId::new("ch1").unwrap(),
            1,
            "Flynn's taxonomy",
        )
        .unwrap()
    }

    #[test]
    fn blank_chapter_title_fails() {
        let err = Chapter::new(ChapterId::new("ch1").unwrap(), 1, "  ", None).unwrap_err();
        assert_eq!(err, OutlineError::EmptyTitle);
    }

    #[test]
    fn blank_description_is_dropped() {
        let chapter = Chapter::new(
            ChapterId::new("ch1").unwrap(),
            1,
            "Fundamentals",
            Some(" ".into()),
        )
        .unwrap();
        assert_eq!(chapter.description(), None);
    }

    #[test]
    fn chapter_is_complete_only_at_full_progress() {
        let id = ChapterId::new("ch1").unwrap();
        let partial = Chapter::from_persisted(id.clone(), 1, "Fundamentals".into(), None, 99).unwrap();
        let full = Chapter::from_persisted(id, 1, "Fundamentals".into(), None, 100).unwrap();
        assert!(!partial.is_complete());
        assert!(full.is_complete());
    }

    #[test]
    fn persisted_progress_over_100_fails() {
        let err = Section::from_persisted(
            SectionId::new("s1").unwrap(),
            ChapterId::new("ch1").unwrap(),
            1,
            "Title".into(),
            false,
            101,
        )
        .unwrap_err();
        assert_eq!(err, OutlineError::ProgressOutOfRange(101));
    }

    #[test]
    fn progress_above_threshold_marks_read_once() {
        let mut s = section();
        assert!(!s.record_progress(75));
        assert!(!s.is_read());

        assert!(s.record_progress(80));
        assert!(s.is_read());

        // Already read: not a new transition, and scrolling back keeps it read.
        assert!(!s.record_progress(90));
        assert!(!s.record_progress(10));
        assert!(s.is_read());
        assert_eq!(s.progress(), 10);
    }

    #[test]
    fn mark_read_ignores_progress() {
        let mut s = section();
        s.mark_read();
        assert!(s.is_read());
        assert_eq!(s.progress(), 0);
    }
}
