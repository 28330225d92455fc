use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use textbook_core::model::{
    Bookmark, BookmarkTarget, Chapter, ChapterId, GlossaryTerm, Quiz, QuizId, QuizResult,
    ReadingPosition, Section, SectionContent, SectionId, TermId, UserAnswerSet,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Chapters, sections and section bodies, plus the counting queries the
/// progress ledger derives percentages from.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert or update a chapter's outline data.
    ///
    /// The stored progress of an existing chapter is preserved so that
    /// re-importing content never resets the reader's state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the chapter cannot be stored.
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError>;

    /// Insert or update a section's outline data, preserving read state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning chapter is missing.
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StorageError>;

    /// All chapters in reading order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_chapters(&self) -> Result<Vec<Chapter>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_section(&self, id: &SectionId) -> Result<Option<Section>, StorageError>;

    /// Sections of a chapter in reading order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sections_for_chapter(&self, chapter: &ChapterId)
    -> Result<Vec<Section>, StorageError>;

    /// Replace the body of a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the section is missing.
    async fn set_section_content(&self, content: &SectionContent) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn section_content(&self, id: &SectionId)
    -> Result<Option<SectionContent>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the section is missing.
    async fn set_section_read(&self, id: &SectionId, read: bool) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the section is missing.
    async fn set_section_progress(&self, id: &SectionId, progress: u8)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chapter is missing.
    async fn set_chapter_progress(&self, id: &ChapterId, progress: u8)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn total_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn read_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn total_all_sections_count(&self) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn total_read_sections_count(&self) -> Result<u64, StorageError>;
}

/// Book-wide progress and per-chapter reading positions.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Last stored overall percentage, `0` if never written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn overall_progress(&self) -> Result<u8, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn set_overall_progress(&self, progress: u8) -> Result<(), StorageError>;

    /// Store the position, replacing the previous one for the same chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_reading_position(&self, position: &ReadingPosition)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn last_read_position(
        &self,
        chapter: &ChapterId,
    ) -> Result<Option<ReadingPosition>, StorageError>;
}

/// Quiz definitions, answer sets and results.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert or replace a quiz definition, preserving completion state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError>;

    /// All quizzes ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz is missing.
    async fn mark_quiz_completed(&self, id: &QuizId, score: u8) -> Result<(), StorageError>;

    /// Append a result with the answers it was graded from. Results are never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn save_quiz_result(
        &self,
        result: &QuizResult,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError>;

    /// Results for a quiz, newest first (`completed_at`, then insertion order).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn results_for_quiz(&self, id: &QuizId) -> Result<Vec<QuizResult>, StorageError>;

    /// The most recent result for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_result(&self, id: &QuizId) -> Result<Option<QuizResult>, StorageError> {
        Ok(self.results_for_quiz(id).await?.into_iter().next())
    }

    /// Answers behind the most recent result, untouched by later attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn graded_answers(&self, id: &QuizId) -> Result<Option<UserAnswerSet>, StorageError>;

    /// Answers of the attempt in progress; empty if none were saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn user_answers(&self, id: &QuizId) -> Result<UserAnswerSet, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_user_answers(
        &self,
        id: &QuizId,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the target is already bookmarked.
    async fn add_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError>;

    /// Returns whether a bookmark was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn remove_bookmark(&self, target: &BookmarkTarget) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_bookmark(&self, target: &BookmarkTarget)
    -> Result<Option<Bookmark>, StorageError>;

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError>;
}

#[async_trait]
pub trait GlossaryRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn upsert_term(&self, term: &GlossaryTerm) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_term(&self, id: &TermId) -> Result<Option<GlossaryTerm>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_terms(&self) -> Result<Vec<GlossaryTerm>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    chapters: HashMap<ChapterId, Chapter>,
    sections: HashMap<SectionId, Section>,
    contents: HashMap<SectionId, SectionContent>,
    overall_progress: u8,
    positions: HashMap<ChapterId, ReadingPosition>,
    quizzes: HashMap<QuizId, Quiz>,
    results: Vec<(QuizResult, UserAnswerSet)>,
    answers: HashMap<QuizId, UserAnswerSet>,
    bookmarks: Vec<Bookmark>,
    terms: HashMap<TermId, GlossaryTerm>,
}

impl MemoryState {
    fn results_newest_first(&self, id: &QuizId) -> Vec<&(QuizResult, UserAnswerSet)> {
        // Reverse insertion order first so the stable sort keeps later inserts ahead on ties.
        let mut results: Vec<_> = self
            .results
            .iter()
            .rev()
            .filter(|(r, _)| &r.quiz_id == id)
            .collect();
        results.sort_by(|a, b| b.0.completed_at.cmp(&a.0.completed_at));
        results
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn rebuild_chapter(chapter: &Chapter, progress: u8) -> Result<Chapter, StorageError> {
    Chapter::from_persisted(
        chapter.id().clone(),
        chapter.order(),
        chapter.title().to_owned(),
        chapter.description().map(str::to_owned),
        progress,
    )
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn rebuild_section(section: &Section, read: bool, progress: u8) -> Result<Section, StorageError> {
    Section::from_persisted(
        section.id().clone(),
        section.chapter_id().clone(),
        section.order(),
        section.title().to_owned(),
        read,
        progress,
    )
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let progress = guard
            .chapters
            .get(chapter.id())
            .map_or(chapter.progress(), Chapter::progress);
        let stored = rebuild_chapter(chapter, progress)?;
        guard.chapters.insert(chapter.id().clone(), stored);
        Ok(())
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.chapters.contains_key(section.chapter_id()) {
            return Err(StorageError::NotFound);
        }
        let stored = match guard.sections.get(section.id()) {
            Some(existing) => rebuild_section(section, existing.is_read(), existing.progress())?,
            None => section.clone(),
        };
        guard.sections.insert(section.id().clone(), stored);
        Ok(())
    }

    async fn get_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StorageError> {
        Ok(self.lock()?.chapters.get(id).cloned())
    }

    async fn list_chapters(&self) -> Result<Vec<Chapter>, StorageError> {
        let mut chapters: Vec<Chapter> = self.lock()?.chapters.values().cloned().collect();
        chapters.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));
        Ok(chapters)
    }

    async fn get_section(&self, id: &SectionId) -> Result<Option<Section>, StorageError> {
        Ok(self.lock()?.sections.get(id).cloned())
    }

    async fn sections_for_chapter(
        &self,
        chapter: &ChapterId,
    ) -> Result<Vec<Section>, StorageError> {
        let mut sections: Vec<Section> = self
            .lock()?
            .sections
            .values()
            .filter(|s| s.chapter_id() == chapter)
            .cloned()
            .collect();
        sections.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));
        Ok(sections)
    }

    async fn set_section_content(&self, content: &SectionContent) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.sections.contains_key(&content.section_id) {
            return Err(StorageError::NotFound);
        }
        guard
            .contents
            .insert(content.section_id.clone(), content.clone());
        Ok(())
    }

    async fn section_content(
        &self,
        id: &SectionId,
    ) -> Result<Option<SectionContent>, StorageError> {
        Ok(self.lock()?.contents.get(id).cloned())
    }

    async fn set_section_read(&self, id: &SectionId, read: bool) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let section = guard.sections.get(id).ok_or(StorageError::NotFound)?;
        let updated = rebuild_section(section, read, section.progress())?;
        guard.sections.insert(id.clone(), updated);
        Ok(())
    }

    async fn set_section_progress(
        &self,
        id: &SectionId,
        progress: u8,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let section = guard.sections.get(id).ok_or(StorageError::NotFound)?;
        let updated = rebuild_section(section, section.is_read(), progress)?;
        guard.sections.insert(id.clone(), updated);
        Ok(())
    }

    async fn set_chapter_progress(
        &self,
        id: &ChapterId,
        progress: u8,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let chapter = guard.chapters.get(id).ok_or(StorageError::NotFound)?;
        let updated = rebuild_chapter(chapter, progress)?;
        guard.chapters.insert(id.clone(), updated);
        Ok(())
    }

    async fn total_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(count(
            guard
                .sections
                .values()
                .filter(|s| s.chapter_id() == chapter)
                .count(),
        ))
    }

    async fn read_sections_count(&self, chapter: &ChapterId) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(count(
            guard
                .sections
                .values()
                .filter(|s| s.chapter_id() == chapter && s.is_read())
                .count(),
        ))
    }

    async fn total_all_sections_count(&self) -> Result<u64, StorageError> {
        Ok(count(self.lock()?.sections.len()))
    }

    async fn total_read_sections_count(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(count(guard.sections.values().filter(|s| s.is_read()).count()))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn overall_progress(&self) -> Result<u8, StorageError> {
        Ok(self.lock()?.overall_progress)
    }

    async fn set_overall_progress(&self, progress: u8) -> Result<(), StorageError> {
        self.lock()?.overall_progress = progress;
        Ok(())
    }

    async fn save_reading_position(
        &self,
        position: &ReadingPosition,
    ) -> Result<(), StorageError> {
        self.lock()?
            .positions
            .insert(position.chapter_id.clone(), position.clone());
        Ok(())
    }

    async fn last_read_position(
        &self,
        chapter: &ChapterId,
    ) -> Result<Option<ReadingPosition>, StorageError> {
        Ok(self.lock()?.positions.get(chapter).cloned())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let mut stored = quiz.clone();
        if let Some(existing) = guard.quizzes.get(quiz.id()) {
            if let Some(score) = existing.last_score() {
                stored.mark_completed(score);
            }
        }
        guard.quizzes.insert(quiz.id().clone(), stored);
        Ok(())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.get(id).cloned())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let mut quizzes: Vec<Quiz> = self.lock()?.quizzes.values().cloned().collect();
        quizzes.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(quizzes)
    }

    async fn mark_quiz_completed(&self, id: &QuizId, score: u8) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let quiz = guard.quizzes.get_mut(id).ok_or(StorageError::NotFound)?;
        quiz.mark_completed(score);
        Ok(())
    }

    async fn save_quiz_result(
        &self,
        result: &QuizResult,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        self.lock()?
            .results
            .push((result.clone(), answers.clone()));
        Ok(())
    }

    async fn results_for_quiz(&self, id: &QuizId) -> Result<Vec<QuizResult>, StorageError> {
        Ok(self
            .lock()?
            .results_newest_first(id)
            .into_iter()
            .map(|(result, _)| result.clone())
            .collect())
    }

    async fn graded_answers(&self, id: &QuizId) -> Result<Option<UserAnswerSet>, StorageError> {
        Ok(self
            .lock()?
            .results_newest_first(id)
            .first()
            .map(|(_, answers)| answers.clone()))
    }

    async fn user_answers(&self, id: &QuizId) -> Result<UserAnswerSet, StorageError> {
        Ok(self.lock()?.answers.get(id).cloned().unwrap_or_default())
    }

    async fn save_user_answers(
        &self,
        id: &QuizId,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        self.lock()?.answers.insert(id.clone(), answers.clone());
        Ok(())
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn add_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard
            .bookmarks
            .iter()
            .any(|b| b.target() == bookmark.target())
        {
            return Err(StorageError::Conflict);
        }
        guard.bookmarks.push(bookmark.clone());
        Ok(())
    }

    async fn remove_bookmark(&self, target: &BookmarkTarget) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.bookmarks.len();
        guard.bookmarks.retain(|b| b.target() != target);
        Ok(guard.bookmarks.len() != before)
    }

    async fn get_bookmark(
        &self,
        target: &BookmarkTarget,
    ) -> Result<Option<Bookmark>, StorageError> {
        Ok(self
            .lock()?
            .bookmarks
            .iter()
            .find(|b| b.target() == target)
            .cloned())
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError> {
        let mut bookmarks: Vec<Bookmark> = self.lock()?.bookmarks.iter().rev().cloned().collect();
        bookmarks.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(bookmarks)
    }
}

#[async_trait]
impl GlossaryRepository for InMemoryRepository {
    async fn upsert_term(&self, term: &GlossaryTerm) -> Result<(), StorageError> {
        self.lock()?.terms.insert(term.id().clone(), term.clone());
        Ok(())
    }

    async fn get_term(&self, id: &TermId) -> Result<Option<GlossaryTerm>, StorageError> {
        Ok(self.lock()?.terms.get(id).cloned())
    }

    async fn list_terms(&self) -> Result<Vec<GlossaryTerm>, StorageError> {
        let mut terms: Vec<GlossaryTerm> = self.lock()?.terms.values().cloned().collect();
        terms.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(terms)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub glossary: Arc<dyn GlossaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            content: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            bookmarks: Arc::new(repo.clone()),
            glossary: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textbook_core::model::{Difficulty, OptionId, QuestionId};
    use textbook_core::time::fixed_now;

    fn chapter(id: &str, order: u32) -> Chapter {
        Chapter::new(ChapterId::new(id).unwrap(), order, format!("Chapter {id}"), None).unwrap()
    }

    fn section(id: &str, chapter: &str, order: u32) -> Section {
        Section::new(
            SectionId::new(id).unwrap(),
            ChapterId::new(chapter).unwrap(),
            order,
            format!("Section {id}"),
        )
        .unwrap()
    }

    fn result(quiz: &str, score: u8, offset_secs: i64) -> QuizResult {
        QuizResult {
            quiz_id: QuizId::new(quiz).unwrap(),
            score,
            time_taken_seconds: 60,
            completed_at: fixed_now() + chrono::Duration::seconds(offset_secs),
            answered_questions: 5,
            correct_answers: 3,
            total_questions: 5,
        }
    }

    #[tokio::test]
    async fn upsert_section_preserves_read_state() {
        let repo = InMemoryRepository::new();
        repo.upsert_chapter(&chapter("ch1", 1)).await.unwrap();
        let s = section("s1", "ch1", 1);
        repo.upsert_section(&s).await.unwrap();
        repo.set_section_read(s.id(), true).await.unwrap();
        repo.set_section_progress(s.id(), 90).await.unwrap();

        repo.upsert_section(&s).await.unwrap();

        let stored = repo.get_section(s.id()).await.unwrap().unwrap();
        assert!(stored.is_read());
        assert_eq!(stored.progress(), 90);
    }

    #[tokio::test]
    async fn section_requires_chapter() {
        let repo = InMemoryRepository::new();
        let err = repo.upsert_section(&section("s1", "missing", 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn counts_follow_read_flags() {
        let repo = InMemoryRepository::new();
        repo.upsert_chapter(&chapter("ch1", 1)).await.unwrap();
        repo.upsert_chapter(&chapter("ch2", 2)).await.unwrap();
        for (id, ch, order) in [("a", "ch1", 1), ("b", "ch1", 2), ("c", "ch2", 1)] {
            repo.upsert_section(&section(id, ch, order)).await.unwrap();
        }
        repo.set_section_read(&SectionId::new("a").unwrap(), true)
            .await
            .unwrap();

        let ch1 = ChapterId::new("ch1").unwrap();
        assert_eq!(repo.total_sections_count(&ch1).await.unwrap(), 2);
        assert_eq!(repo.read_sections_count(&ch1).await.unwrap(), 1);
        assert_eq!(repo.total_all_sections_count().await.unwrap(), 3);
        assert_eq!(repo.total_read_sections_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn latest_result_wins_by_timestamp_then_insertion() {
        let repo = InMemoryRepository::new();
        let none = UserAnswerSet::new();
        repo.save_quiz_result(&result("quiz1", 40, 10), &none).await.unwrap();
        repo.save_quiz_result(&result("quiz1", 80, 20), &none).await.unwrap();
        repo.save_quiz_result(&result("quiz1", 60, 5), &none).await.unwrap();

        let latest = repo
            .latest_result(&QuizId::new("quiz1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.score, 80);

        repo.save_quiz_result(&result("quiz1", 100, 20), &none).await.unwrap();
        let latest = repo
            .latest_result(&QuizId::new("quiz1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.score, 100);
    }

    #[tokio::test]
    async fn graded_answers_follow_latest_result_not_current_attempt() {
        let repo = InMemoryRepository::new();
        let quiz1 = QuizId::new("quiz1").unwrap();
        let q1 = QuestionId::new("q1").unwrap();
        let first = UserAnswerSet::new().with(q1.clone(), vec![OptionId::new("a").unwrap()]);
        let second = UserAnswerSet::new().with(q1, vec![OptionId::new("b").unwrap()]);
        assert_eq!(repo.graded_answers(&quiz1).await.unwrap(), None);

        repo.save_quiz_result(&result("quiz1", 40, 20), &first).await.unwrap();
        repo.save_quiz_result(&result("quiz1", 80, 10), &second).await.unwrap();
        repo.save_user_answers(&quiz1, &UserAnswerSet::new()).await.unwrap();

        assert_eq!(repo.graded_answers(&quiz1).await.unwrap(), Some(first));
        assert!(repo.user_answers(&quiz1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reimporting_quiz_keeps_completion() {
        let repo = InMemoryRepository::new();
        let quiz = Quiz::new(QuizId::new("quiz1").unwrap(), "Basics", Difficulty::Easy, 10, vec![])
            .unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();
        repo.mark_quiz_completed(quiz.id(), 70).await.unwrap();

        repo.upsert_quiz(&quiz).await.unwrap();

        let stored = repo.get_quiz(quiz.id()).await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert_eq!(stored.last_score(), Some(70));
    }

    #[tokio::test]
    async fn duplicate_bookmark_conflicts() {
        let repo = InMemoryRepository::new();
        let target = BookmarkTarget::Section(SectionId::new("s1").unwrap());
        let bookmark = Bookmark::new(target.clone(), "Amdahl", fixed_now()).unwrap();
        repo.add_bookmark(&bookmark).await.unwrap();

        let err = repo.add_bookmark(&bookmark).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        assert!(repo.remove_bookmark(&target).await.unwrap());
        assert!(!repo.remove_bookmark(&target).await.unwrap());
    }
}
