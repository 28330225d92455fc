use std::sync::Arc;

use storage::repository::QuizRepository;
use textbook_core::grading::{self, Grade, QuestionReview};
use textbook_core::model::{Quiz, QuizId, QuizResult};

use crate::error::QuizError;

/// Regraded view of the stored answers for a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReview {
    pub quiz_id: QuizId,
    pub grade: Grade,
    pub questions: Vec<QuestionReview>,
}

/// Read side of quizzes: listings, result history and reviews.
#[derive(Clone)]
pub struct QuizResultsService {
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizResultsService {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { quizzes }
    }

    /// All quizzes with their completion flag and last score.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>, QuizError> {
        Ok(self.quizzes.list_quizzes().await?)
    }

    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn latest_result(&self, quiz_id: &QuizId) -> Result<Option<QuizResult>, QuizError> {
        Ok(self.quizzes.latest_result(quiz_id).await?)
    }

    /// All attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    pub async fn history(&self, quiz_id: &QuizId) -> Result<Vec<QuizResult>, QuizError> {
        Ok(self.quizzes.results_for_quiz(quiz_id).await?)
    }

    /// Regrade the answers behind the latest result question by question.
    ///
    /// Attempts started after that result do not change the review.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuizNotFound` or a storage failure.
    pub async fn review(&self, quiz_id: &QuizId) -> Result<QuizReview, QuizError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(quiz_id.clone()))?;
        let answers = self
            .quizzes
            .graded_answers(quiz_id)
            .await?
            .unwrap_or_default();

        Ok(QuizReview {
            quiz_id: quiz_id.clone(),
            grade: grading::grade(&quiz, &answers),
            questions: grading::review(&quiz, &answers),
        })
    }
}
