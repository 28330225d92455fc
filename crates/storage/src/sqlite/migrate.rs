use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS chapters (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL CHECK (position >= 0),
            title TEXT NOT NULL,
            description TEXT,
            progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            chapter_id TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            title TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
            progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS section_content (
            section_id TEXT PRIMARY KEY,
            blocks_json TEXT NOT NULL,
            FOREIGN KEY (section_id) REFERENCES sections(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS app_progress (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            overall_progress INTEGER NOT NULL CHECK (overall_progress BETWEEN 0 AND 100)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS reading_positions (
            chapter_id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL,
            scroll_position INTEGER NOT NULL,
            saved_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            chapter_id TEXT,
            difficulty TEXT NOT NULL,
            time_limit_minutes INTEGER NOT NULL CHECK (time_limit_minutes > 0),
            is_completed INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
            last_score INTEGER CHECK (last_score BETWEEN 0 AND 100)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            quiz_id TEXT NOT NULL,
            id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            explanation TEXT,
            PRIMARY KEY (quiz_id, id),
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_options (
            quiz_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
            PRIMARY KEY (quiz_id, question_id, id),
            FOREIGN KEY (quiz_id, question_id)
                REFERENCES quiz_questions(quiz_id, id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            time_taken_seconds INTEGER NOT NULL CHECK (time_taken_seconds >= 0),
            completed_at TEXT NOT NULL,
            answered_questions INTEGER NOT NULL CHECK (answered_questions >= 0),
            correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
            total_questions INTEGER NOT NULL CHECK (total_questions >= 0)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_answers (
            quiz_id TEXT PRIMARY KEY,
            answers_json TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS bookmarks (
            kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            label TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (kind, target_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS glossary_terms (
            id TEXT PRIMARY KEY,
            term TEXT NOT NULL,
            definition TEXT NOT NULL,
            chapter_id TEXT
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_sections_chapter_position
            ON sections (chapter_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_results_quiz_completed
            ON quiz_results (quiz_id, completed_at);
    ",
];

const SCHEMA_V2: &[&str] = &[
    // Each result keeps the answers it was graded from; later attempts only
    // touch `user_answers`.
    r"
        ALTER TABLE quiz_results ADD COLUMN answers_json TEXT NOT NULL DEFAULT '{}';
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, SCHEMA_V1), (2, SCHEMA_V2)];

/// Runs the versioned schema migrations.
///
/// Version 1 creates the outline, progress, quiz, bookmark and glossary tables.
/// Version 2 stores graded answers next to each quiz result.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for &(version, statements) in MIGRATIONS {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;

        for statement in statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
