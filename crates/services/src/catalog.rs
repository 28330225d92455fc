//! Content catalog documents: the JSON shape content is imported from.

use serde::Deserialize;
use textbook_core::model::{
    Chapter, ChapterId, ContentBlock, Difficulty, GlossaryTerm, Quiz, QuizId, QuizQuestion,
    Section, SectionContent, SectionId, TermId,
};

use crate::error::CatalogError;

const DEMO_CATALOG: &str = include_str!("../data/demo_catalog.json");

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogChapter {
    pub id: ChapterId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<CatalogSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogQuiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub chapter_id: Option<ChapterId>,
    pub difficulty: Difficulty,
    pub time_limit_minutes: u32,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogTerm {
    pub id: TermId,
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub chapter_id: Option<ChapterId>,
}

/// A full content drop: outline, section bodies, quizzes and glossary.
///
/// Chapter and section order follows document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub chapters: Vec<CatalogChapter>,
    #[serde(default)]
    pub quizzes: Vec<CatalogQuiz>,
    #[serde(default)]
    pub glossary: Vec<CatalogTerm>,
}

/// Validated domain values built from a catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntries {
    pub chapters: Vec<Chapter>,
    pub sections: Vec<(Section, SectionContent)>,
    pub quizzes: Vec<Quiz>,
    pub terms: Vec<GlossaryTerm>,
}

fn position(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

impl Catalog {
    /// # Errors
    ///
    /// Returns `CatalogError::Json` if the document does not match the catalog shape.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The built-in parallel computing architecture course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Json` if the embedded document is malformed.
    pub fn demo() -> Result<Self, CatalogError> {
        Self::from_json(DEMO_CATALOG)
    }

    /// Validate every entry into domain values.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Model` for the first invalid entry.
    pub fn into_entries(self) -> Result<CatalogEntries, CatalogError> {
        let mut entries = CatalogEntries::default();

        for (c_index, chapter) in self.chapters.into_iter().enumerate() {
            entries.chapters.push(
                Chapter::new(
                    chapter.id.clone(),
                    position(c_index),
                    chapter.title,
                    chapter.description,
                )
                .map_err(textbook_core::Error::from)?,
            );
            for (s_index, section) in chapter.sections.into_iter().enumerate() {
                let outline = Section::new(
                    section.id.clone(),
                    chapter.id.clone(),
                    position(s_index),
                    section.title,
                )
                .map_err(textbook_core::Error::from)?;
                let content = SectionContent::new(section.id, section.blocks)
                    .map_err(textbook_core::Error::from)?;
                entries.sections.push((outline, content));
            }
        }

        for quiz in self.quizzes {
            let mut built = Quiz::new(
                quiz.id,
                quiz.title,
                quiz.difficulty,
                quiz.time_limit_minutes,
                quiz.questions,
            )
            .map_err(textbook_core::Error::from)?;
            if let Some(chapter_id) = quiz.chapter_id {
                built = built.with_chapter(chapter_id);
            }
            entries.quizzes.push(built);
        }

        for term in self.glossary {
            entries.terms.push(
                GlossaryTerm::new(term.id, term.term, term.definition, term.chapter_id)
                    .map_err(textbook_core::Error::from)?,
            );
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textbook_core::model::QuestionKind;

    #[test]
    fn demo_catalog_is_valid() {
        let entries = Catalog::demo().unwrap().into_entries().unwrap();
        assert!(entries.chapters.len() >= 3);
        assert!(!entries.sections.is_empty());
        assert!(!entries.terms.is_empty());

        let quiz1 = entries
            .quizzes
            .iter()
            .find(|q| q.id().as_str() == "quiz1")
            .unwrap();
        assert_eq!(quiz1.questions().len(), 5);
    }

    #[test]
    fn order_follows_document_order() {
        let raw = r#"{
            "chapters": [
                {"id": "b", "title": "Second in id order", "sections": [
                    {"id": "b-2", "title": "First", "blocks": [{"type": "text", "text": "Hi"}]},
                    {"id": "b-1", "title": "Second"}
                ]},
                {"id": "a", "title": "Later"}
            ]
        }"#;
        let entries = Catalog::from_json(raw).unwrap().into_entries().unwrap();
        assert_eq!(entries.chapters[0].id().as_str(), "b");
        assert_eq!(entries.chapters[0].order(), 1);
        assert_eq!(entries.chapters[1].order(), 2);
        assert_eq!(entries.sections[0].0.id().as_str(), "b-2");
        assert_eq!(entries.sections[0].0.order(), 1);
        assert_eq!(entries.sections[1].0.order(), 2);
    }

    #[test]
    fn quiz_questions_parse_kinds() {
        let raw = r#"{
            "quizzes": [{
                "id": "qz", "title": "Kinds", "difficulty": "hard", "time_limit_minutes": 5,
                "questions": [{
                    "id": "q1", "text": "Pick", "kind": "multiple_choice",
                    "options": [{"id": "a", "text": "A", "is_correct": true}, {"id": "b", "text": "B"}]
                }]
            }]
        }"#;
        let entries = Catalog::from_json(raw).unwrap().into_entries().unwrap();
        let question = &entries.quizzes[0].questions()[0];
        assert_eq!(question.kind, QuestionKind::MultipleChoice);
        assert!(!question.options[1].is_correct);
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let blank_id = r#"{"chapters": [{"id": " ", "title": "x"}]}"#;
        assert!(matches!(
            Catalog::from_json(blank_id).unwrap_err(),
            CatalogError::Json(_)
        ));

        let zero_limit = r#"{"quizzes": [{"id": "q", "title": "t", "difficulty": "easy", "time_limit_minutes": 0}]}"#;
        let err = Catalog::from_json(zero_limit)
            .unwrap()
            .into_entries()
            .unwrap_err();
        assert!(matches!(err, CatalogError::Model(_)));
    }
}
