use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::{OptionId, QuestionId, QuizId};

//
// ─── USER ANSWERS ─────────────────────────────────────────────────────────────
//

/// The learner's chosen options per question.
///
/// Option order is preserved; single-choice and true/false questions only
/// look at the first chosen option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAnswerSet {
    answers: BTreeMap<QuestionId, Vec<OptionId>>,
}

impl UserAnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the answer for a question. An empty choice clears it.
    /// Repeated option ids are kept once, in first-seen order.
    pub fn set(&mut self, question: QuestionId, chosen: Vec<OptionId>) {
        let mut deduped: Vec<OptionId> = Vec::with_capacity(chosen.len());
        for option in chosen {
            if !deduped.contains(&option) {
                deduped.push(option);
            }
        }

        if deduped.is_empty() {
            self.answers.remove(&question);
        } else {
            self.answers.insert(question, deduped);
        }
    }

    /// Builder-style `set`, handy for fixtures.
    #[must_use]
    pub fn with(mut self, question: QuestionId, chosen: Vec<OptionId>) -> Self {
        self.set(question, chosen);
        self
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&[OptionId]> {
        self.answers.get(question).map(Vec::as_slice)
    }

    /// Number of questions with a recorded answer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

//
// ─── QUIZ RESULT ──────────────────────────────────────────────────────────────
//

/// Outcome of one completed quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub quiz_id: QuizId,
    pub score: u8,
    pub time_taken_seconds: u64,
    pub completed_at: DateTime<Utc>,
    pub answered_questions: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

impl QuizResult {
    /// Questions left unanswered at the time of grading.
    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.total_questions.saturating_sub(self.answered_questions)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
