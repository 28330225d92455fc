use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storage::repository::{ContentRepository, ProgressRepository};
use textbook_core::Clock;
use textbook_core::model::{ChapterId, ReadingPosition, Section, SectionId};
use textbook_core::progress::{COMPLETE, SectionCounts, clamp_percent, crosses_read_threshold};
use tracing::{debug, warn};

use crate::error::ProgressError;

/// Outcome of a section-level progress write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// The section is (now) marked read.
    pub section_read: bool,
    /// Recomputed chapter percentage, if the write triggered a recompute.
    pub chapter_progress: Option<u8>,
    /// Overall percentage after the write.
    pub overall_progress: u8,
}

/// Ids already counted during this process lifetime.
///
/// Only a shortcut for skipping redundant writes; every percentage is still
/// derived from the persisted read flags.
#[derive(Debug, Default)]
struct LedgerSession {
    counted_sections: HashSet<SectionId>,
    completed_chapters: HashSet<ChapterId>,
}

/// Keeps section, chapter and overall reading progress consistent.
///
/// Every public operation has a `try_*` form that reports failures and a
/// tolerant form that logs them and returns a safe default.
pub struct ProgressLedger {
    clock: Clock,
    content: Arc<dyn ContentRepository>,
    progress: Arc<dyn ProgressRepository>,
    session: Mutex<LedgerSession>,
}

impl ProgressLedger {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn ContentRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            content,
            progress,
            session: Mutex::new(LedgerSession::default()),
        }
    }

    fn session(&self) -> MutexGuard<'_, LedgerSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_section(&self, id: &SectionId) -> Result<Section, ProgressError> {
        self.content
            .get_section(id)
            .await?
            .ok_or_else(|| ProgressError::UnknownSection(id.clone()))
    }

    async fn mark_read(&self, section: &Section) -> Result<(), ProgressError> {
        let counted = self.session().counted_sections.contains(section.id());
        if !(counted && section.is_read()) {
            self.content.set_section_read(section.id(), true).await?;
            self.session()
                .counted_sections
                .insert(section.id().clone());
        }
        Ok(())
    }

    async fn recompute_chapter(&self, chapter: &ChapterId) -> Result<u8, ProgressError> {
        let counts = SectionCounts::new(
            self.content.read_sections_count(chapter).await?,
            self.content.total_sections_count(chapter).await?,
        );
        let progress = counts.percent();
        self.content.set_chapter_progress(chapter, progress).await?;
        if progress >= COMPLETE {
            self.session().completed_chapters.insert(chapter.clone());
        }
        debug!(chapter = %chapter, read = counts.read, total = counts.total, progress, "recomputed chapter progress");
        Ok(progress)
    }

    async fn recompute_overall(&self) -> Result<u8, ProgressError> {
        let counts = SectionCounts::new(
            self.content.total_read_sections_count().await?,
            self.content.total_all_sections_count().await?,
        );
        let progress = counts.percent();
        self.progress.set_overall_progress(progress).await?;
        debug!(read = counts.read, total = counts.total, progress, "recomputed overall progress");
        Ok(progress)
    }

    //
    // ─── FALLIBLE OPERATIONS ───────────────────────────────────────────────────
    //

    /// Store a section's reading progress (clamped to `0..=100`).
    ///
    /// Progress above the read threshold marks the section read and recomputes
    /// the owning chapter and the overall percentage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownSection` or a storage failure.
    pub async fn try_update_section_progress(
        &self,
        section_id: &SectionId,
        progress: i64,
    ) -> Result<ProgressUpdate, ProgressError> {
        let mut section = self.load_section(section_id).await?;
        let was_read = section.is_read();
        section.record_progress(clamp_percent(progress));
        self.content
            .set_section_progress(section_id, section.progress())
            .await?;

        if !crosses_read_threshold(section.progress()) {
            return Ok(ProgressUpdate {
                section_read: was_read,
                chapter_progress: None,
                overall_progress: self.progress.overall_progress().await?,
            });
        }

        self.mark_read(&section).await?;
        let chapter_progress = self.recompute_chapter(section.chapter_id()).await?;
        let overall_progress = self.recompute_overall().await?;

        Ok(ProgressUpdate {
            section_read: true,
            chapter_progress: Some(chapter_progress),
            overall_progress,
        })
    }

    /// Mark a section read regardless of its progress value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ChapterMismatch` if the section belongs to a
    /// different chapter, or a lookup/storage failure.
    pub async fn try_mark_section_as_read(
        &self,
        section_id: &SectionId,
        chapter_id: &ChapterId,
    ) -> Result<ProgressUpdate, ProgressError> {
        let section = self.load_section(section_id).await?;
        if section.chapter_id() != chapter_id {
            return Err(ProgressError::ChapterMismatch {
                section: section_id.clone(),
                expected: chapter_id.clone(),
                actual: section.chapter_id().clone(),
            });
        }

        self.mark_read(&section).await?;
        let chapter_progress = self.recompute_chapter(chapter_id).await?;
        let overall_progress = self.recompute_overall().await?;

        Ok(ProgressUpdate {
            section_read: true,
            chapter_progress: Some(chapter_progress),
            overall_progress,
        })
    }

    /// Store a chapter progress hint.
    ///
    /// The first time in this session a chapter moves from below 100 to 100,
    /// everything is recomputed from read counts. Returns the chapter's
    /// progress after the call.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownChapter` or a storage failure.
    pub async fn try_update_chapter_progress(
        &self,
        chapter_id: &ChapterId,
        progress: i64,
    ) -> Result<u8, ProgressError> {
        let chapter = self
            .content
            .get_chapter(chapter_id)
            .await?
            .ok_or_else(|| ProgressError::UnknownChapter(chapter_id.clone()))?;
        let progress = clamp_percent(progress);
        self.content
            .set_chapter_progress(chapter_id, progress)
            .await?;

        let first_completion = chapter.progress() < COMPLETE
            && progress >= COMPLETE
            && self
                .session()
                .completed_chapters
                .insert(chapter_id.clone());

        if !first_completion {
            return Ok(progress);
        }

        debug!(chapter = %chapter_id, "chapter reached 100%; running full recompute");
        self.try_recompute_all().await?;
        self.try_chapter_progress(chapter_id).await
    }

    /// Stored overall percentage.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn try_overall_progress(&self) -> Result<u8, ProgressError> {
        Ok(self.progress.overall_progress().await?)
    }

    /// Stored percentage of one chapter.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownChapter` or a storage failure.
    pub async fn try_chapter_progress(&self, chapter_id: &ChapterId) -> Result<u8, ProgressError> {
        self.content
            .get_chapter(chapter_id)
            .await?
            .map(|c| c.progress())
            .ok_or_else(|| ProgressError::UnknownChapter(chapter_id.clone()))
    }

    /// Remember where the reader stopped in a chapter.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn try_save_reading_position(
        &self,
        chapter_id: &ChapterId,
        section_id: &SectionId,
        scroll_position: i64,
    ) -> Result<ReadingPosition, ProgressError> {
        let position = ReadingPosition {
            chapter_id: chapter_id.clone(),
            section_id: section_id.clone(),
            scroll_position,
            saved_at: self.clock.now(),
        };
        self.progress.save_reading_position(&position).await?;
        Ok(position)
    }

    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn try_last_read_position(
        &self,
        chapter_id: &ChapterId,
    ) -> Result<Option<ReadingPosition>, ProgressError> {
        Ok(self.progress.last_read_position(chapter_id).await?)
    }

    /// Recompute every chapter and the overall percentage from read counts.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn try_recompute_all(&self) -> Result<u8, ProgressError> {
        for chapter in self.content.list_chapters().await? {
            self.recompute_chapter(chapter.id()).await?;
        }
        self.recompute_overall().await
    }

    //
    // ─── TOLERANT OPERATIONS ───────────────────────────────────────────────────
    //

    /// Like `try_update_section_progress`, but logs failures and yields `None`.
    pub async fn update_section_progress(
        &self,
        section_id: &SectionId,
        progress: i64,
    ) -> Option<ProgressUpdate> {
        self.try_update_section_progress(section_id, progress)
            .await
            .inspect_err(|e| warn!(section = %section_id, error = %e, "section progress update failed"))
            .ok()
    }

    /// Like `try_mark_section_as_read`, but logs failures and yields `None`.
    pub async fn mark_section_as_read(
        &self,
        section_id: &SectionId,
        chapter_id: &ChapterId,
    ) -> Option<ProgressUpdate> {
        self.try_mark_section_as_read(section_id, chapter_id)
            .await
            .inspect_err(|e| warn!(section = %section_id, error = %e, "mark as read failed"))
            .ok()
    }

    /// Like `try_update_chapter_progress`, but logs failures and yields `None`.
    pub async fn update_chapter_progress(
        &self,
        chapter_id: &ChapterId,
        progress: i64,
    ) -> Option<u8> {
        self.try_update_chapter_progress(chapter_id, progress)
            .await
            .inspect_err(|e| warn!(chapter = %chapter_id, error = %e, "chapter progress update failed"))
            .ok()
    }

    /// Overall percentage, or 0 when it cannot be read.
    pub async fn overall_progress(&self) -> u8 {
        self.try_overall_progress()
            .await
            .inspect_err(|e| warn!(error = %e, "overall progress unavailable"))
            .unwrap_or(0)
    }

    /// Chapter percentage, or 0 when it cannot be read.
    pub async fn chapter_progress(&self, chapter_id: &ChapterId) -> u8 {
        self.try_chapter_progress(chapter_id)
            .await
            .inspect_err(|e| warn!(chapter = %chapter_id, error = %e, "chapter progress unavailable"))
            .unwrap_or(0)
    }

    /// Like `try_save_reading_position`, but logs failures and yields `None`.
    pub async fn save_reading_position(
        &self,
        chapter_id: &ChapterId,
        section_id: &SectionId,
        scroll_position: i64,
    ) -> Option<ReadingPosition> {
        self.try_save_reading_position(chapter_id, section_id, scroll_position)
            .await
            .inspect_err(|e| warn!(chapter = %chapter_id, error = %e, "saving reading position failed"))
            .ok()
    }

    /// Saved position for the chapter; `None` when absent or unreadable.
    pub async fn last_read_position(&self, chapter_id: &ChapterId) -> Option<ReadingPosition> {
        self.try_last_read_position(chapter_id)
            .await
            .inspect_err(|e| warn!(chapter = %chapter_id, error = %e, "reading position unavailable"))
            .ok()
            .flatten()
    }

    /// Like `try_recompute_all`, but logs failures and yields `None`.
    pub async fn recompute_all(&self) -> Option<u8> {
        self.try_recompute_all()
            .await
            .inspect_err(|e| warn!(error = %e, "full progress recompute failed"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use textbook_core::model::{Chapter, Section};
    use textbook_core::time::fixed_clock;

    async fn seeded(chapters: &[(&str, usize)]) -> (ProgressLedger, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for (order, (chapter, sections)) in chapters.iter().enumerate() {
            let order = u32::try_from(order).unwrap() + 1;
            let id = ChapterId::new(*chapter).unwrap();
            repo.upsert_chapter(&Chapter::new(id.clone(), order, *chapter, None).unwrap())
                .await
                .unwrap();
            for n in 1..=*sections {
                let section = Section::new(
                    SectionId::new(format!("{chapter}-s{n}")).unwrap(),
                    id.clone(),
                    u32::try_from(n).unwrap(),
                    format!("Section {n}"),
                )
                .unwrap();
                repo.upsert_section(&section).await.unwrap();
            }
        }
        let ledger = ProgressLedger::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (ledger, repo)
    }

    fn sid(id: &str) -> SectionId {
        SectionId::new(id).unwrap()
    }

    fn cid(id: &str) -> ChapterId {
        ChapterId::new(id).unwrap()
    }

    #[tokio::test]
    async fn progress_at_threshold_does_not_mark_read() {
        let (ledger, repo) = seeded(&[("ch1", 2)]).await;

        let update = ledger
            .try_update_section_progress(&sid("ch1-s1"), 75)
            .await
            .unwrap();
        assert!(!update.section_read);
        assert_eq!(update.chapter_progress, None);

        let section = repo.get_section(&sid("ch1-s1")).await.unwrap().unwrap();
        assert!(!section.is_read());
        assert_eq!(section.progress(), 75);
    }

    #[tokio::test]
    async fn progress_above_threshold_recomputes_chapter_and_overall() {
        let (ledger, _repo) = seeded(&[("ch1", 2), ("ch2", 2)]).await;

        let update = ledger
            .try_update_section_progress(&sid("ch1-s1"), 76)
            .await
            .unwrap();
        assert!(update.section_read);
        assert_eq!(update.chapter_progress, Some(50));
        assert_eq!(update.overall_progress, 25);
        assert_eq!(ledger.overall_progress().await, 25);
    }

    #[tokio::test]
    async fn repeated_updates_do_not_double_count() {
        let (ledger, _repo) = seeded(&[("ch1", 4)]).await;
        for _ in 0..3 {
            ledger.update_section_progress(&sid("ch1-s1"), 90).await;
        }
        ledger
            .mark_section_as_read(&sid("ch1-s1"), &cid("ch1"))
            .await;
        assert_eq!(ledger.chapter_progress(&cid("ch1")).await, 25);
    }

    #[tokio::test]
    async fn progress_is_clamped() {
        let (ledger, repo) = seeded(&[("ch1", 1)]).await;
        ledger.update_section_progress(&sid("ch1-s1"), 250).await;
        let section = repo.get_section(&sid("ch1-s1")).await.unwrap().unwrap();
        assert_eq!(section.progress(), 100);

        ledger.update_section_progress(&sid("ch1-s1"), -10).await;
        let section = repo.get_section(&sid("ch1-s1")).await.unwrap().unwrap();
        assert_eq!(section.progress(), 0);
        assert!(section.is_read(), "a read section stays read");
    }

    #[tokio::test]
    async fn mark_read_rejects_wrong_chapter() {
        let (ledger, _repo) = seeded(&[("ch1", 1), ("ch2", 1)]).await;
        let err = ledger
            .try_mark_section_as_read(&sid("ch1-s1"), &cid("ch2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::ChapterMismatch { .. }));
        assert!(ledger.mark_section_as_read(&sid("ch1-s1"), &cid("ch2")).await.is_none());
    }

    #[tokio::test]
    async fn unknown_ids_fall_back_to_defaults() {
        let (ledger, _repo) = seeded(&[("ch1", 1)]).await;
        assert!(ledger.update_section_progress(&sid("nope"), 90).await.is_none());
        assert!(ledger.update_chapter_progress(&cid("nope"), 50).await.is_none());
        assert_eq!(ledger.chapter_progress(&cid("nope")).await, 0);
        assert!(ledger.last_read_position(&cid("ch1")).await.is_none());
    }

    #[tokio::test]
    async fn chapter_hint_is_stored_until_first_completion() {
        let (ledger, _repo) = seeded(&[("ch1", 2)]).await;
        ledger
            .mark_section_as_read(&sid("ch1-s1"), &cid("ch1"))
            .await
            .unwrap();

        assert_eq!(ledger.update_chapter_progress(&cid("ch1"), 80).await, Some(80));
        assert_eq!(ledger.chapter_progress(&cid("ch1")).await, 80);

        // Crossing to 100 recomputes from read counts: only 1 of 2 sections is read.
        assert_eq!(ledger.update_chapter_progress(&cid("ch1"), 100).await, Some(50));
        assert_eq!(ledger.overall_progress().await, 50);
    }

    #[tokio::test]
    async fn recompute_all_with_no_sections_is_zero() {
        let (ledger, _repo) = seeded(&[]).await;
        assert_eq!(ledger.recompute_all().await, Some(0));
        assert_eq!(ledger.overall_progress().await, 0);
    }

    #[tokio::test]
    async fn reading_position_is_stored_verbatim() {
        let (ledger, _repo) = seeded(&[("ch1", 2)]).await;
        let saved = ledger
            .save_reading_position(&cid("ch1"), &sid("ch1-s2"), -42)
            .await
            .unwrap();
        assert_eq!(ledger.last_read_position(&cid("ch1")).await, Some(saved.clone()));
        assert_eq!(saved.scroll_position, -42);
    }
}
