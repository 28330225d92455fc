use std::sync::Arc;

use storage::repository::GlossaryRepository;
use textbook_core::model::{GlossaryTerm, TermId};

use crate::error::ContentError;

#[derive(Clone)]
pub struct GlossaryService {
    glossary: Arc<dyn GlossaryRepository>,
}

fn sort_key(term: &GlossaryTerm) -> String {
    term.term().to_lowercase()
}

impl GlossaryService {
    #[must_use]
    pub fn new(glossary: Arc<dyn GlossaryRepository>) -> Self {
        Self { glossary }
    }

    /// All terms, alphabetical ignoring case.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn list_terms(&self) -> Result<Vec<GlossaryTerm>, ContentError> {
        let mut terms = self.glossary.list_terms().await?;
        terms.sort_by_cached_key(sort_key);
        Ok(terms)
    }

    /// Case-insensitive search over terms and definitions.
    ///
    /// Prefix matches on the term come first, then other term matches, then
    /// definition matches; ties are alphabetical. A blank query lists everything.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn search(&self, query: &str) -> Result<Vec<GlossaryTerm>, ContentError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.list_terms().await;
        }

        let mut hits: Vec<_> = self
            .glossary
            .list_terms()
            .await?
            .into_iter()
            .filter_map(|t| t.matches(&query).map(|rank| (rank, sort_key(&t), t)))
            .collect();
        hits.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        Ok(hits.into_iter().map(|(_, _, t)| t).collect())
    }

    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn term(&self, id: &TermId) -> Result<Option<GlossaryTerm>, ContentError> {
        Ok(self.glossary.get_term(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    async fn service(terms: &[(&str, &str, &str)]) -> GlossaryService {
        let repo = InMemoryRepository::new();
        for (id, term, definition) in terms {
            repo.upsert_term(
                &GlossaryTerm::new(TermId::new(*id).unwrap(), *term, *definition, None).unwrap(),
            )
            .await
            .unwrap();
        }
        GlossaryService::new(Arc::new(repo))
    }

    fn names(terms: &[GlossaryTerm]) -> Vec<&str> {
        terms.iter().map(GlossaryTerm::term).collect()
    }

    #[tokio::test]
    async fn list_is_case_insensitive_alphabetical() {
        let svc = service(&[
            ("z", "warp", "GPU thread group"),
            ("a", "Amdahl's law", "Serial fraction bound"),
            ("m", "MESI protocol", "Coherence states"),
        ])
        .await;
        assert_eq!(
            names(&svc.list_terms().await.unwrap()),
            vec!["Amdahl's law", "MESI protocol", "warp"]
        );
    }

    #[tokio::test]
    async fn term_matches_rank_before_definition_matches() {
        let svc = service(&[
            ("coh", "Cache coherence", "Consistent values across caches"),
            ("mesi", "MESI protocol", "A cache coherence protocol"),
            ("fs", "False sharing", "Unrelated data on one cache line"),
            ("warp", "Warp", "GPU thread group"),
        ])
        .await;

        let hits = svc.search("  CACHE ").await.unwrap();
        assert_eq!(
            names(&hits),
            vec!["Cache coherence", "False sharing", "MESI protocol"]
        );
        assert!(svc.search("systolic").await.unwrap().is_empty());
        assert_eq!(svc.search("").await.unwrap().len(), 4);
    }
}
