use std::sync::Arc;
use std::time::Duration;

use storage::repository::QuizRepository;
use textbook_core::Clock;
use textbook_core::model::{OptionId, QuestionId, QuizId, QuizResult};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::session::{FinishTrigger, QuizSession};
use super::timer::{DEFAULT_TICK, QuizTimer, TimerEvent};
use crate::error::QuizError;

const TIMER_CHANNEL_CAPACITY: usize = 8;

/// Starts, answers and finishes quiz attempts against the quiz store.
///
/// Persistence after grading is best-effort: failures are logged and the
/// graded result is still returned.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Load a quiz and start an attempt with an empty answer set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuizNotFound` or a storage failure while loading.
    pub async fn start_session(&self, quiz_id: &QuizId) -> Result<QuizSession, QuizError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(quiz_id.clone()))?;

        let mut session = QuizSession::new(quiz);
        session.start(self.clock.now())?;

        if let Err(e) = self
            .quizzes
            .save_user_answers(quiz_id, session.answers())
            .await
        {
            warn!(quiz = %quiz_id, error = %e, "failed to reset stored answers");
        }
        Ok(session)
    }

    /// Record an answer and persist the updated answer set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the session rejects the answer.
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        question: &QuestionId,
        chosen: Vec<OptionId>,
    ) -> Result<(), QuizError> {
        session.answer(question, chosen)?;
        let quiz_id = session.quiz().id();
        if let Err(e) = self.quizzes.save_user_answers(quiz_id, session.answers()).await {
            warn!(quiz = %quiz_id, error = %e, "failed to persist answers");
        }
        Ok(())
    }

    /// Grade the attempt, then persist answers, result and completion.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` if the session is not running.
    pub async fn finish(
        &self,
        session: &mut QuizSession,
        trigger: FinishTrigger,
    ) -> Result<QuizResult, QuizError> {
        let result = session.finish(self.clock.now(), trigger)?;
        let quiz_id = &result.quiz_id;

        info!(
            quiz = %quiz_id,
            ?trigger,
            score = result.score,
            correct = result.correct_answers,
            total = result.total_questions,
            "quiz finished"
        );

        if let Err(e) = self.quizzes.save_user_answers(quiz_id, session.answers()).await {
            warn!(quiz = %quiz_id, error = %e, "failed to persist final answers");
        }
        if let Err(e) = self
            .quizzes
            .save_quiz_result(&result, session.answers())
            .await
        {
            warn!(quiz = %quiz_id, error = %e, "failed to persist quiz result");
        }
        if let Err(e) = self.quizzes.mark_quiz_completed(quiz_id, result.score).await {
            warn!(quiz = %quiz_id, error = %e, "failed to mark quiz completed");
        }

        Ok(result)
    }
}

/// What the runner observed while waiting on the countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Tick { remaining: Duration },
    Finished(QuizResult),
}

struct ActiveQuiz {
    session: QuizSession,
    timer: QuizTimer,
    events: mpsc::Receiver<TimerEvent>,
}

/// Drives at most one timed quiz attempt at a time.
///
/// Starting a new attempt cancels the countdown of the previous one.
pub struct QuizRunner {
    service: Arc<QuizSessionService>,
    tick: Duration,
    active: Option<ActiveQuiz>,
}

impl QuizRunner {
    #[must_use]
    pub fn new(service: Arc<QuizSessionService>) -> Self {
        Self {
            service,
            tick: DEFAULT_TICK,
            active: None,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Start a quiz, replacing any attempt in progress.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the quiz cannot be loaded.
    pub async fn start(&mut self, quiz_id: &QuizId) -> Result<(), QuizError> {
        self.cancel();

        let session = self.service.start_session(quiz_id).await?;
        let (tx, events) = mpsc::channel(TIMER_CHANNEL_CAPACITY);
        let timer = QuizTimer::start(session.quiz().time_limit(), self.tick, tx);
        self.active = Some(ActiveQuiz {
            session,
            timer,
            events,
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuizError::NoActiveQuiz` or an answer rejection.
    pub async fn answer(
        &mut self,
        question: &QuestionId,
        chosen: Vec<OptionId>,
    ) -> Result<(), QuizError> {
        let active = self.active.as_mut().ok_or(QuizError::NoActiveQuiz)?;
        self.service
            .answer(&mut active.session, question, chosen)
            .await
    }

    /// Finish on the user's request.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveQuiz` if nothing is running.
    pub async fn finish(&mut self) -> Result<QuizResult, QuizError> {
        self.finish_by(FinishTrigger::User).await
    }

    /// Wait for the next countdown event without acting on it.
    ///
    /// Cancel-safe: dropping the future loses no event and leaves the attempt
    /// running. A closed channel is reported as `Expired`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveQuiz` if nothing is running.
    pub async fn wait_event(&mut self) -> Result<TimerEvent, QuizError> {
        let active = self.active.as_mut().ok_or(QuizError::NoActiveQuiz)?;
        Ok(active.events.recv().await.unwrap_or(TimerEvent::Expired))
    }

    /// Wait for the next countdown event. Expiry finishes the attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveQuiz` if nothing is running.
    pub async fn next_event(&mut self) -> Result<RunnerEvent, QuizError> {
        match self.wait_event().await? {
            TimerEvent::Tick { remaining } => Ok(RunnerEvent::Tick { remaining }),
            TimerEvent::Expired => self
                .finish_by(FinishTrigger::TimerExpired)
                .await
                .map(RunnerEvent::Finished),
        }
    }

    /// Abandon the current attempt without grading it. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.timer.cancel();
                true
            }
            None => false,
        }
    }

    /// Grade and persist the attempt, recording what ended it.
    ///
    /// The attempt stays active until grading and persistence complete, so a
    /// caller dropped mid-way can finish it again. An attempt already graded
    /// returns its stored result.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveQuiz` if nothing is running.
    pub async fn finish_by(&mut self, trigger: FinishTrigger) -> Result<QuizResult, QuizError> {
        let active = self.active.as_mut().ok_or(QuizError::NoActiveQuiz)?;
        active.timer.cancel();
        let result = match active.session.result() {
            Some(result) => result.clone(),
            None => self.service.finish(&mut active.session, trigger).await?,
        };
        self.active = None;
        Ok(result)
    }
}
