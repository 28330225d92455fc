use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::model::ids::{ChapterId, OptionId, QuestionId, QuizId};
use crate::progress::COMPLETE;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDefinitionError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz time limit must be > 0 minutes")]
    ZeroTimeLimit,

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("question {question} has duplicate option id: {option}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u8),

    #[error("unknown {kind}: {raw}")]
    UnknownVariant { kind: &'static str, raw: String },
}

//
// ─── DIFFICULTY / KIND ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError::UnknownVariant` for unrecognised values.
    pub fn parse(raw: &str) -> Result<Self, QuizDefinitionError> {
        match raw {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuizDefinitionError::UnknownVariant {
                kind: "difficulty",
                raw: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a question is answered and graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Exactly one option is correct; only the first chosen option counts.
    SingleChoice,
    /// One or more options are correct; the chosen set must match exactly.
    MultipleChoice,
    /// Two options, one correct; graded like `SingleChoice`.
    TrueFalse,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError::UnknownVariant` for unrecognised values.
    pub fn parse(raw: &str) -> Result<Self, QuizDefinitionError> {
        match raw {
            "single_choice" => Ok(QuestionKind::SingleChoice),
            "multiple_choice" => Ok(QuestionKind::MultipleChoice),
            "true_false" => Ok(QuestionKind::TrueFalse),
            other => Err(QuizDefinitionError::UnknownVariant {
                kind: "question kind",
                raw: other.to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn allows_multiple(self) -> bool {
        matches!(self, QuestionKind::MultipleChoice)
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<QuizOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// Ids of all options flagged correct.
    #[must_use]
    pub fn correct_option_ids(&self) -> BTreeSet<&OptionId> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| &o.id)
            .collect()
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&QuizOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A quiz definition plus the learner's completion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    chapter_id: Option<ChapterId>,
    difficulty: Difficulty,
    time_limit_minutes: u32,
    questions: Vec<QuizQuestion>,
    is_completed: bool,
    last_score: Option<u8>,
}

impl Quiz {
    /// Creates a quiz that has not been completed yet.
    ///
    /// An empty question list is allowed; grading it yields a score of 0.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` for a blank title, a zero time limit, or
    /// duplicate question/option ids.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        difficulty: Difficulty,
        time_limit_minutes: u32,
        questions: Vec<QuizQuestion>,
    ) -> Result<Self, QuizDefinitionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizDefinitionError::EmptyTitle);
        }
        if time_limit_minutes == 0 {
            return Err(QuizDefinitionError::ZeroTimeLimit);
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(&question.id) {
                return Err(QuizDefinitionError::DuplicateQuestion(question.id.clone()));
            }
            let mut options = HashSet::new();
            for option in &question.options {
                if !options.insert(&option.id) {
                    return Err(QuizDefinitionError::DuplicateOption {
                        question: question.id.clone(),
                        option: option.id.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id,
            title,
            chapter_id: None,
            difficulty,
            time_limit_minutes,
            questions,
            is_completed: false,
            last_score: None,
        })
    }

    /// Rehydrate a quiz from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` if the definition or stored score is invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuizId,
        title: String,
        chapter_id: Option<ChapterId>,
        difficulty: Difficulty,
        time_limit_minutes: u32,
        questions: Vec<QuizQuestion>,
        is_completed: bool,
        last_score: Option<u8>,
    ) -> Result<Self, QuizDefinitionError> {
        let mut quiz = Self::new(id, title, difficulty, time_limit_minutes, questions)?;
        if let Some(score) = last_score.filter(|s| *s > COMPLETE) {
            return Err(QuizDefinitionError::ScoreOutOfRange(score));
        }
        quiz.chapter_id = chapter_id;
        quiz.is_completed = is_completed;
        quiz.last_score = last_score;
        Ok(quiz)
    }

    #[must_use]
    pub fn with_chapter(mut self, chapter_id: ChapterId) -> Self {
        self.chapter_id = Some(chapter_id);
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn chapter_id(&self) -> Option<&ChapterId> {
        self.chapter_id.as_ref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.time_limit_minutes) * 60)
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| &q.id == id)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn last_score(&self) -> Option<u8> {
        self.last_score
    }

    /// Record a finished attempt.
    pub fn mark_completed(&mut self, score: u8) {
        self.is_completed = true;
        self.last_score = Some(score.min(COMPLETE));
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
