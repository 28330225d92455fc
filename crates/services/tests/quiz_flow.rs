use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use services::{
    AppServices, Catalog, Clock, FinishTrigger, QuizError, QuizSessionService, RunnerEvent,
    TimerEvent,
};
use storage::repository::{InMemoryRepository, QuizRepository, StorageError};
use textbook_core::model::{OptionId, QuestionId, Quiz, QuizId, QuizResult, UserAnswerSet};
use textbook_core::time::fixed_now;

fn qid(id: &str) -> QuestionId {
    QuestionId::new(id).unwrap()
}

fn opts(ids: &[&str]) -> Vec<OptionId> {
    ids.iter().map(|id| OptionId::new(*id).unwrap()).collect()
}

async fn demo_services() -> AppServices {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    services
        .content()
        .import_catalog(Catalog::demo().unwrap())
        .await
        .unwrap();
    services
}

/// Three of the five demo questions answered correctly.
fn three_of_five() -> Vec<(QuestionId, Vec<OptionId>)> {
    vec![
        (qid("q1"), opts(&["b"])),
        (qid("q2"), opts(&["b"])),
        (qid("q3"), opts(&["true"])),
        (qid("q4"), opts(&["a"])),
        (qid("q5"), opts(&["a"])),
    ]
}

#[tokio::test]
async fn manual_finish_grades_and_persists() {
    let services = demo_services().await;
    let sessions = services.quiz_sessions();
    let quiz1 = QuizId::new("quiz1").unwrap();

    let mut session = sessions.start_session(&quiz1).await.unwrap();
    for (question, chosen) in three_of_five() {
        sessions.answer(&mut session, &question, chosen).await.unwrap();
    }
    let result = sessions
        .finish(&mut session, FinishTrigger::User)
        .await
        .unwrap();

    assert_eq!(result.correct_answers, 3);
    assert_eq!(result.total_questions, 5);
    assert_eq!(result.answered_questions, 5);
    assert_eq!(result.score, 60);

    let results = services.quiz_results();
    assert_eq!(results.latest_result(&quiz1).await.unwrap(), Some(result));
    let quizzes = results.list_quizzes().await.unwrap();
    let stored = quizzes.iter().find(|q| q.id() == &quiz1).unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.last_score(), Some(60));

    let review = results.review(&quiz1).await.unwrap();
    assert_eq!(review.grade.correct_answers, 3);
    let wrong: Vec<_> = review
        .questions
        .iter()
        .filter(|q| !q.correct)
        .map(|q| q.question_id.as_str())
        .collect();
    assert_eq!(wrong, vec!["q4", "q5"]);
}

#[tokio::test]
async fn finishing_twice_is_rejected() {
    let services = demo_services().await;
    let sessions = services.quiz_sessions();
    let mut session = sessions
        .start_session(&QuizId::new("quiz3").unwrap())
        .await
        .unwrap();
    sessions
        .finish(&mut session, FinishTrigger::User)
        .await
        .unwrap();
    let err = sessions
        .finish(&mut session, FinishTrigger::User)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::NotInProgress));
}

#[tokio::test]
async fn unknown_quiz_cannot_start() {
    let services = demo_services().await;
    let err = services
        .quiz_sessions()
        .start_session(&QuizId::new("quiz9").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::QuizNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_matches_manual_finish() {
    let quiz1 = QuizId::new("quiz1").unwrap();

    let manual = {
        let services = demo_services().await;
        let mut runner = services.quiz_runner();
        runner.start(&quiz1).await.unwrap();
        for (question, chosen) in three_of_five() {
            runner.answer(&question, chosen).await.unwrap();
        }
        runner.finish().await.unwrap()
    };

    let services = demo_services().await;
    let mut runner = services.quiz_runner().with_tick(Duration::from_secs(60));
    runner.start(&quiz1).await.unwrap();
    for (question, chosen) in three_of_five() {
        runner.answer(&question, chosen).await.unwrap();
    }

    let mut ticks = 0;
    let timed = loop {
        match runner.next_event().await.unwrap() {
            RunnerEvent::Tick { .. } => ticks += 1,
            RunnerEvent::Finished(result) => break result,
        }
    };

    assert!(ticks > 0);
    assert!(!runner.is_active());
    assert_eq!(timed, manual);
    assert_eq!(
        services.quiz_results().latest_result(&quiz1).await.unwrap(),
        Some(timed)
    );
}

#[tokio::test(start_paused = true)]
async fn starting_another_quiz_cancels_the_first() {
    let services = demo_services().await;
    let quiz1 = QuizId::new("quiz1").unwrap();
    let quiz3 = QuizId::new("quiz3").unwrap();
    let mut runner = services.quiz_runner().with_tick(Duration::from_secs(60));

    runner.start(&quiz1).await.unwrap();
    runner.start(&quiz3).await.unwrap();
    assert_eq!(runner.session().unwrap().quiz().id(), &quiz3);

    let finished = loop {
        if let RunnerEvent::Finished(result) = runner.next_event().await.unwrap() {
            break result;
        }
    };
    assert_eq!(finished.quiz_id, quiz3);
    assert_eq!(finished.answered_questions, 0);
    assert_eq!(finished.score, 0);

    let results = services.quiz_results();
    assert!(results.history(&quiz1).await.unwrap().is_empty());
    assert_eq!(results.history(&quiz3).await.unwrap().len(), 1);
    assert!(matches!(
        runner.next_event().await.unwrap_err(),
        QuizError::NoActiveQuiz
    ));
}

#[tokio::test]
async fn review_of_a_result_survives_a_cancelled_retake() {
    let services = demo_services().await;
    let quiz1 = QuizId::new("quiz1").unwrap();
    let mut runner = services.quiz_runner();

    runner.start(&quiz1).await.unwrap();
    for (question, chosen) in three_of_five() {
        runner.answer(&question, chosen).await.unwrap();
    }
    let finished = runner.finish().await.unwrap();

    runner.start(&quiz1).await.unwrap();
    runner
        .answer(&qid("q1"), opts(&["a"]))
        .await
        .unwrap();
    assert!(runner.cancel());

    let results = services.quiz_results();
    let latest = results.latest_result(&quiz1).await.unwrap().unwrap();
    assert_eq!(latest, finished);
    let review = results.review(&quiz1).await.unwrap();
    assert_eq!(review.grade.correct_answers, latest.correct_answers);
    assert_eq!(review.grade.answered_questions, latest.answered_questions);
    assert_eq!(review.grade.score, latest.score);
}

#[tokio::test(start_paused = true)]
async fn attempt_survives_a_wait_cut_short_at_the_time_limit() {
    let services = demo_services().await;
    let quiz3 = QuizId::new("quiz3").unwrap();
    let mut runner = services.quiz_runner().with_tick(Duration::from_secs(60));
    runner.start(&quiz3).await.unwrap();
    runner.answer(&qid("q1"), opts(&["a"])).await.unwrap();

    // The wait window equals the five-minute limit, so expiry and the
    // deadline race; either way the attempt must still be finishable.
    let expired = tokio::time::timeout(Duration::from_secs(5 * 60), async {
        loop {
            if runner.wait_event().await.unwrap() == TimerEvent::Expired {
                return;
            }
        }
    })
    .await
    .is_ok();

    assert!(runner.is_active());
    let trigger = if expired {
        FinishTrigger::TimerExpired
    } else {
        FinishTrigger::User
    };
    let result = runner.finish_by(trigger).await.unwrap();
    assert_eq!(result.correct_answers, 1);
    assert!(!runner.is_active());
    assert_eq!(
        services.quiz_results().history(&quiz3).await.unwrap(),
        vec![result]
    );
}

#[tokio::test]
async fn cancel_discards_the_attempt() {
    let services = demo_services().await;
    let quiz3 = QuizId::new("quiz3").unwrap();
    let mut runner = services.quiz_runner();

    runner.start(&quiz3).await.unwrap();
    assert!(runner.cancel());
    assert!(!runner.cancel());
    assert!(
        services
            .quiz_results()
            .history(&quiz3)
            .await
            .unwrap()
            .is_empty()
    );
}

/// Quiz store that loads normally but refuses every write.
struct ReadOnlyQuizzes {
    inner: InMemoryRepository,
}

fn refused() -> StorageError {
    StorageError::Connection("store is read-only".into())
}

#[async_trait]
impl QuizRepository for ReadOnlyQuizzes {
    async fn upsert_quiz(&self, _quiz: &Quiz) -> Result<(), StorageError> {
        Err(refused())
    }
    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        self.inner.get_quiz(id).await
    }
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        self.inner.list_quizzes().await
    }
    async fn mark_quiz_completed(&self, _id: &QuizId, _score: u8) -> Result<(), StorageError> {
        Err(refused())
    }
    async fn save_quiz_result(
        &self,
        _result: &QuizResult,
        _answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        Err(refused())
    }
    async fn results_for_quiz(&self, id: &QuizId) -> Result<Vec<QuizResult>, StorageError> {
        self.inner.results_for_quiz(id).await
    }
    async fn graded_answers(&self, id: &QuizId) -> Result<Option<UserAnswerSet>, StorageError> {
        self.inner.graded_answers(id).await
    }
    async fn user_answers(&self, id: &QuizId) -> Result<UserAnswerSet, StorageError> {
        self.inner.user_answers(id).await
    }
    async fn save_user_answers(
        &self,
        _id: &QuizId,
        _answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        Err(refused())
    }
}

#[tokio::test]
async fn result_is_returned_when_persistence_fails() {
    let repo = InMemoryRepository::new();
    for quiz in Catalog::demo().unwrap().into_entries().unwrap().quizzes {
        repo.upsert_quiz(&quiz).await.unwrap();
    }
    let sessions = QuizSessionService::new(
        Clock::fixed(fixed_now()),
        Arc::new(ReadOnlyQuizzes {
            inner: repo.clone(),
        }),
    );
    let quiz1 = QuizId::new("quiz1").unwrap();

    let mut session = sessions.start_session(&quiz1).await.unwrap();
    for (question, chosen) in three_of_five() {
        sessions.answer(&mut session, &question, chosen).await.unwrap();
    }
    let result = sessions
        .finish(&mut session, FinishTrigger::User)
        .await
        .unwrap();

    assert_eq!(result.score, 60);
    assert!(repo.results_for_quiz(&quiz1).await.unwrap().is_empty());
    assert!(!repo.get_quiz(&quiz1).await.unwrap().unwrap().is_completed());
}
