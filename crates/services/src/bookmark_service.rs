use std::sync::Arc;

use storage::repository::BookmarkRepository;
use textbook_core::Clock;
use textbook_core::model::{Bookmark, BookmarkTarget};

use crate::error::BookmarkError;

#[derive(Clone)]
pub struct BookmarkService {
    clock: Clock,
    bookmarks: Arc<dyn BookmarkRepository>,
}

impl BookmarkService {
    #[must_use]
    pub fn new(clock: Clock, bookmarks: Arc<dyn BookmarkRepository>) -> Self {
        Self { clock, bookmarks }
    }

    /// # Errors
    ///
    /// Returns `BookmarkError::AlreadyBookmarked`, an invalid label, or a storage failure.
    pub async fn add(
        &self,
        target: BookmarkTarget,
        label: &str,
    ) -> Result<Bookmark, BookmarkError> {
        let bookmark = Bookmark::new(target, label, self.clock.now())?;
        self.bookmarks.add_bookmark(&bookmark).await?;
        Ok(bookmark)
    }

    /// Returns whether a bookmark was removed.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn remove(&self, target: &BookmarkTarget) -> Result<bool, BookmarkError> {
        Ok(self.bookmarks.remove_bookmark(target).await?)
    }

    /// Add the bookmark if missing, remove it otherwise. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an invalid label or a storage failure.
    pub async fn toggle(&self, target: BookmarkTarget, label: &str) -> Result<bool, BookmarkError> {
        if self.remove(&target).await? {
            return Ok(false);
        }
        self.add(target, label).await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn is_bookmarked(&self, target: &BookmarkTarget) -> Result<bool, BookmarkError> {
        Ok(self.bookmarks.get_bookmark(target).await?.is_some())
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn list(&self) -> Result<Vec<Bookmark>, BookmarkError> {
        Ok(self.bookmarks.list_bookmarks().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use textbook_core::model::{SectionId, TermId};
    use textbook_core::time::fixed_now;

    #[tokio::test]
    async fn toggle_flips_state() {
        let svc = BookmarkService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let target = BookmarkTarget::Section(SectionId::new("s2-2").unwrap());

        assert!(svc.toggle(target.clone(), "MESI").await.unwrap());
        assert!(svc.is_bookmarked(&target).await.unwrap());
        assert!(!svc.toggle(target.clone(), "MESI").await.unwrap());
        assert!(!svc.is_bookmarked(&target).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_add_is_reported() {
        let svc = BookmarkService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let target = BookmarkTarget::Term(TermId::new("warp").unwrap());
        svc.add(target.clone(), "Warp").await.unwrap();
        let err = svc.add(target, "Warp").await.unwrap_err();
        assert!(matches!(err, BookmarkError::AlreadyBookmarked));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut clock = Clock::fixed(fixed_now());
        for id in ["s1-1", "s1-2", "s1-3"] {
            let svc = BookmarkService::new(clock, repo.clone());
            svc.add(BookmarkTarget::Section(SectionId::new(id).unwrap()), id)
                .await
                .unwrap();
            clock.advance(Duration::minutes(1));
        }
        let svc = BookmarkService::new(clock, repo);
        let labels: Vec<_> = svc
            .list()
            .await
            .unwrap()
            .iter()
            .map(|b| b.label().to_owned())
            .collect();
        assert_eq!(labels, vec!["s1-3", "s1-2", "s1-1"]);
    }
}
