use std::time::Duration;

use chrono::{DateTime, Utc};
use textbook_core::grading::{self, Grade};
use textbook_core::model::{OptionId, QuestionId, Quiz, QuizResult, UserAnswerSet};
use textbook_core::time::elapsed_seconds;

use crate::error::QuizError;

/// Lifecycle of a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    NotStarted,
    InProgress,
    Finished,
}

/// What ended a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishTrigger {
    User,
    TimerExpired,
}

/// One timed attempt at a quiz.
///
/// Answers can change only while the attempt is in progress; finishing grades
/// the frozen answer set exactly once.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    state: QuizState,
    started_at: Option<DateTime<Utc>>,
    answers: UserAnswerSet,
    result: Option<QuizResult>,
    finished_by: Option<FinishTrigger>,
}

impl QuizSession {
    #[must_use]
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            state: QuizState::NotStarted,
            started_at: None,
            answers: UserAnswerSet::new(),
            result: None,
            finished_by: None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn answers(&self) -> &UserAnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn finished_by(&self) -> Option<FinishTrigger> {
        self.finished_by
    }

    /// # Errors
    ///
    /// Returns `QuizError::AlreadyStarted` unless the session is fresh.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), QuizError> {
        if self.state != QuizState::NotStarted {
            return Err(QuizError::AlreadyStarted);
        }
        self.state = QuizState::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Time left on the countdown at `now`.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let limit = self.quiz.time_limit();
        match (self.state, self.started_at) {
            (QuizState::InProgress, Some(start)) => {
                limit.saturating_sub(Duration::from_secs(elapsed_seconds(start, now)))
            }
            (QuizState::NotStarted, _) => limit,
            _ => Duration::ZERO,
        }
    }

    /// Replace the answer for a question. An empty choice clears it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` outside an active attempt, or
    /// `UnknownQuestion`/`UnknownOption` for ids not in the quiz.
    pub fn answer(&mut self, question: &QuestionId, chosen: Vec<OptionId>) -> Result<(), QuizError> {
        if self.state != QuizState::InProgress {
            return Err(QuizError::NotInProgress);
        }
        let definition = self
            .quiz
            .question(question)
            .ok_or_else(|| QuizError::UnknownQuestion(question.clone()))?;
        if let Some(unknown) = chosen.iter().find(|o| definition.option(o).is_none()) {
            return Err(QuizError::UnknownOption {
                question: question.clone(),
                option: unknown.clone(),
            });
        }
        self.answers.set(question.clone(), chosen);
        Ok(())
    }

    /// Current grade of the answer set, without finishing.
    #[must_use]
    pub fn grade(&self) -> Grade {
        grading::grade(&self.quiz, &self.answers)
    }

    /// Stop the attempt and grade it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` if the attempt was never started or
    /// has already finished.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        trigger: FinishTrigger,
    ) -> Result<QuizResult, QuizError> {
        let Some(started_at) = self.started_at.filter(|_| self.state == QuizState::InProgress)
        else {
            return Err(QuizError::NotInProgress);
        };

        let grade = self.grade();
        let result = QuizResult {
            quiz_id: self.quiz.id().clone(),
            score: grade.score,
            time_taken_seconds: elapsed_seconds(started_at, now),
            completed_at: now,
            answered_questions: grade.answered_questions,
            correct_answers: grade.correct_answers,
            total_questions: grade.total_questions,
        };

        self.state = QuizState::Finished;
        self.finished_by = Some(trigger);
        self.result = Some(result.clone());
        Ok(result)
    }
}
