use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use textbook_core::model::{
    ChapterId, Difficulty, OptionId, QuestionId, QuestionKind, Quiz, QuizId, QuizOption,
    QuizQuestion, QuizResult, UserAnswerSet,
};

use super::SqliteRepository;
use super::mapping::{conn, i64_to_percent, i64_to_u32, map_result_row, ser, u64_to_i64};
use crate::repository::{QuizRepository, StorageError};

impl SqliteRepository {
    async fn load_questions(&self, quiz_id: &QuizId) -> Result<Vec<QuizQuestion>, StorageError> {
        let question_rows = sqlx::query(
            r"
            SELECT id, text, kind, explanation
            FROM quiz_questions
            WHERE quiz_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(quiz_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let option_rows = sqlx::query(
            r"
            SELECT question_id, id, text, is_correct
            FROM quiz_options
            WHERE quiz_id = ?1
            ORDER BY question_id ASC, position ASC
            ",
        )
        .bind(quiz_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let id = QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?;
            let kind = QuestionKind::parse(&row.try_get::<String, _>("kind").map_err(ser)?)
                .map_err(ser)?;
            let mut options = Vec::new();
            for option in &option_rows {
                let question_id: String = option.try_get("question_id").map_err(ser)?;
                if question_id == id.as_str() {
                    options.push(map_option_row(option)?);
                }
            }
            questions.push(QuizQuestion {
                id,
                text: row.try_get("text").map_err(ser)?,
                kind,
                options,
                explanation: row.try_get("explanation").map_err(ser)?,
            });
        }
        Ok(questions)
    }

    async fn quiz_from_row(&self, row: &SqliteRow) -> Result<Quiz, StorageError> {
        let id = QuizId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?;
        let questions = self.load_questions(&id).await?;
        let chapter_id = row
            .try_get::<Option<String>, _>("chapter_id")
            .map_err(ser)?
            .map(ChapterId::new)
            .transpose()
            .map_err(ser)?;
        let last_score = row
            .try_get::<Option<i64>, _>("last_score")
            .map_err(ser)?
            .map(|s| i64_to_percent("last_score", s))
            .transpose()?;

        Quiz::from_persisted(
            id,
            row.try_get("title").map_err(ser)?,
            chapter_id,
            Difficulty::parse(&row.try_get::<String, _>("difficulty").map_err(ser)?)
                .map_err(ser)?,
            i64_to_u32(
                "time_limit_minutes",
                row.try_get("time_limit_minutes").map_err(ser)?,
            )?,
            questions,
            row.try_get::<i64, _>("is_completed").map_err(ser)? != 0,
            last_score,
        )
        .map_err(ser)
    }
}

fn map_option_row(row: &SqliteRow) -> Result<QuizOption, StorageError> {
    Ok(QuizOption {
        id: OptionId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?,
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    })
}

fn position(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index).map_err(|_| StorageError::Serialization("position overflow".into()))
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (
                id, title, chapter_id, difficulty, time_limit_minutes, is_completed, last_score
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- completion state survives re-imports of the definition
                title = excluded.title,
                chapter_id = excluded.chapter_id,
                difficulty = excluded.difficulty,
                time_limit_minutes = excluded.time_limit_minutes
            ",
        )
        .bind(quiz.id().as_str())
        .bind(quiz.title())
        .bind(quiz.chapter_id().map(ChapterId::as_str))
        .bind(quiz.difficulty().as_str())
        .bind(i64::from(quiz.time_limit_minutes()))
        .bind(i64::from(quiz.is_completed()))
        .bind(quiz.last_score().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = ?1")
            .bind(quiz.id().as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (q_index, question) in quiz.questions().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO quiz_questions (quiz_id, id, position, text, kind, explanation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(quiz.id().as_str())
            .bind(question.id.as_str())
            .bind(position(q_index)?)
            .bind(question.text.as_str())
            .bind(question.kind.as_str())
            .bind(question.explanation.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (o_index, option) in question.options.iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO quiz_options (quiz_id, question_id, id, position, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(quiz.id().as_str())
                .bind(question.id.as_str())
                .bind(option.id.as_str())
                .bind(position(o_index)?)
                .bind(option.text.as_str())
                .bind(i64::from(option.is_correct))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, chapter_id, difficulty, time_limit_minutes, is_completed, last_score
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => self.quiz_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, chapter_id, difficulty, time_limit_minutes, is_completed, last_score
            FROM quizzes
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in &rows {
            quizzes.push(self.quiz_from_row(row).await?);
        }
        Ok(quizzes)
    }

    async fn mark_quiz_completed(&self, id: &QuizId, score: u8) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE quizzes SET is_completed = 1, last_score = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(i64::from(score.min(100)))
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn save_quiz_result(
        &self,
        result: &QuizResult,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        let answers_json = serde_json::to_string(answers).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO quiz_results (
                quiz_id, score, time_taken_seconds, completed_at,
                answered_questions, correct_answers, total_questions, answers_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(result.quiz_id.as_str())
        .bind(i64::from(result.score))
        .bind(u64_to_i64("time_taken_seconds", result.time_taken_seconds)?)
        .bind(result.completed_at)
        .bind(i64::from(result.answered_questions))
        .bind(i64::from(result.correct_answers))
        .bind(i64::from(result.total_questions))
        .bind(answers_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn results_for_quiz(&self, id: &QuizId) -> Result<Vec<QuizResult>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT quiz_id, score, time_taken_seconds, completed_at,
                   answered_questions, correct_answers, total_questions
            FROM quiz_results
            WHERE quiz_id = ?1
            ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn graded_answers(&self, id: &QuizId) -> Result<Option<UserAnswerSet>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT answers_json
            FROM quiz_results
            WHERE quiz_id = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|row| {
            let raw: String = row.try_get("answers_json").map_err(ser)?;
            serde_json::from_str(&raw).map_err(ser)
        })
        .transpose()
    }

    async fn user_answers(&self, id: &QuizId) -> Result<UserAnswerSet, StorageError> {
        let row = sqlx::query("SELECT answers_json FROM user_answers WHERE quiz_id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("answers_json").map_err(ser)?;
                serde_json::from_str(&raw).map_err(ser)
            }
            None => Ok(UserAnswerSet::new()),
        }
    }

    async fn save_user_answers(
        &self,
        id: &QuizId,
        answers: &UserAnswerSet,
    ) -> Result<(), StorageError> {
        let answers_json = serde_json::to_string(answers).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO user_answers (quiz_id, answers_json)
            VALUES (?1, ?2)
            ON CONFLICT(quiz_id) DO UPDATE SET answers_json = excluded.answers_json
            ",
        )
        .bind(id.as_str())
        .bind(answers_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
