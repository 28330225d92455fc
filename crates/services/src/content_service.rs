use std::sync::Arc;

use storage::repository::{ContentRepository, GlossaryRepository, QuizRepository};
use textbook_core::model::{Chapter, Section, SectionContent, SectionId};
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{CatalogError, ContentError};

/// A chapter with its sections, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterOutline {
    pub chapter: Chapter,
    pub sections: Vec<Section>,
}

/// Counts of entries written by a catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub chapters: usize,
    pub sections: usize,
    pub quizzes: usize,
    pub terms: usize,
}

/// Reading-side access to the book plus the catalog import entry point.
#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepository>,
    quizzes: Arc<dyn QuizRepository>,
    glossary: Arc<dyn GlossaryRepository>,
}

impl ContentService {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentRepository>,
        quizzes: Arc<dyn QuizRepository>,
        glossary: Arc<dyn GlossaryRepository>,
    ) -> Self {
        Self {
            content,
            quizzes,
            glossary,
        }
    }

    /// All chapters with their sections and current progress.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` if the outline cannot be read.
    pub async fn table_of_contents(&self) -> Result<Vec<ChapterOutline>, ContentError> {
        let chapters = self.content.list_chapters().await?;
        let mut outline = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            let sections = self.content.sections_for_chapter(chapter.id()).await?;
            outline.push(ChapterOutline { chapter, sections });
        }
        Ok(outline)
    }

    /// # Errors
    ///
    /// Returns `ContentError::UnknownSection` if the section does not exist.
    pub async fn section(&self, id: &SectionId) -> Result<Section, ContentError> {
        self.content
            .get_section(id)
            .await?
            .ok_or_else(|| ContentError::UnknownSection(id.clone()))
    }

    /// Body of a section; empty if none was imported.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::UnknownSection` if the section does not exist.
    pub async fn section_content(&self, id: &SectionId) -> Result<SectionContent, ContentError> {
        let section = self.section(id).await?;
        Ok(self
            .content
            .section_content(section.id())
            .await?
            .unwrap_or_else(|| SectionContent {
                section_id: id.clone(),
                blocks: Vec::new(),
            }))
    }

    /// Write every catalog entry to the stores.
    ///
    /// Reader state (read flags, progress, quiz completion) of entries that
    /// already exist is kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for invalid entries or storage failures. Entries
    /// validated before the failure may already be written.
    pub async fn import_catalog(&self, catalog: Catalog) -> Result<ImportSummary, CatalogError> {
        let entries = catalog.into_entries()?;

        for chapter in &entries.chapters {
            self.content.upsert_chapter(chapter).await?;
        }
        for (section, body) in &entries.sections {
            self.content.upsert_section(section).await?;
            self.content.set_section_content(body).await?;
        }
        for quiz in &entries.quizzes {
            self.quizzes.upsert_quiz(quiz).await?;
        }
        for term in &entries.terms {
            self.glossary.upsert_term(term).await?;
        }

        let summary = ImportSummary {
            chapters: entries.chapters.len(),
            sections: entries.sections.len(),
            quizzes: entries.quizzes.len(),
            terms: entries.terms.len(),
        };
        info!(
            chapters = summary.chapters,
            sections = summary.sections,
            quizzes = summary.quizzes,
            terms = summary.terms,
            "catalog imported"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;

    fn service(storage: &Storage) -> ContentService {
        ContentService::new(
            Arc::clone(&storage.content),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.glossary),
        )
    }

    #[tokio::test]
    async fn demo_import_builds_ordered_outline() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        let summary = svc.import_catalog(Catalog::demo().unwrap()).await.unwrap();
        assert_eq!(summary.chapters, 3);

        let toc = svc.table_of_contents().await.unwrap();
        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0].chapter.id().as_str(), "ch1");
        assert_eq!(toc[0].sections[0].id().as_str(), "s1-1");
        assert!(toc.iter().all(|c| c.chapter.progress() == 0));

        let body = svc
            .section_content(&SectionId::new("s1-2").unwrap())
            .await
            .unwrap();
        assert!(body.word_count() > 0);
    }

    #[tokio::test]
    async fn reimport_keeps_read_state() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        svc.import_catalog(Catalog::demo().unwrap()).await.unwrap();

        let id = SectionId::new("s1-1").unwrap();
        storage.content.set_section_read(&id, true).await.unwrap();
        svc.import_catalog(Catalog::demo().unwrap()).await.unwrap();

        assert!(svc.section(&id).await.unwrap().is_read());
    }

    #[tokio::test]
    async fn unknown_section_is_reported() {
        let storage = Storage::in_memory();
        let err = service(&storage)
            .section(&SectionId::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::UnknownSection(_)));
    }
}
