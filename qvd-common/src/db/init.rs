//! Database initialization
//!
//! Opens (or creates) the SQLite database and ensures every table exists.
//! Table creation is idempotent, so this runs on every startup.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::Result;

/// Open the database at `database_url` and create missing tables
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    if let Some(path) = sqlite_file_path(database_url) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    // WAL lets dashboard reads proceed while an edit transaction is open
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("Opened database: {}", database_url);

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// The pool keeps its only connection alive forever; an in-memory SQLite
/// database disappears with the connection that created it.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_questions_table(pool).await?;
    create_duplicates_table(pool).await?;
    create_enhanced_questions_table(pool).await?;
    create_enhanced_choices_table(pool).await?;
    create_verification_results_table(pool).await?;
    create_extracted_images_table(pool).await?;

    info!("Database schema initialized");
    Ok(())
}

/// Filesystem path of a file-backed SQLite URL, `None` for in-memory databases
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            file_path TEXT NOT NULL,
            page INTEGER,
            original_question_number INTEGER,
            array_order INTEGER,
            question_text TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_file_path ON questions(file_path)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_duplicates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS duplicates (
            id INTEGER PRIMARY KEY,
            representative_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            file_path TEXT NOT NULL,
            page INTEGER,
            original_question_number INTEGER,
            array_order INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_duplicates_representative \
         ON duplicates(representative_id, file_path)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_enhanced_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enhanced_questions (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            enhanced_text TEXT NOT NULL,
            category TEXT,
            status TEXT NOT NULL DEFAULT 'needs_review'
                CHECK (status IN ('verified', 'likely_correct', 'needs_review', 'incorrect', 'corrected')),
            explanation TEXT,
            requires_image INTEGER NOT NULL DEFAULT 0,
            image_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_enhanced_choices_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT: ids never reused, so ORDER BY id is creation order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enhanced_choices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            enhanced_question_id INTEGER NOT NULL
                REFERENCES enhanced_questions(id) ON DELETE CASCADE,
            choice_text TEXT NOT NULL,
            is_correct INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_enhanced_choices_question \
         ON enhanced_choices(enhanced_question_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_verification_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verification_results (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL REFERENCES enhanced_questions(id) ON DELETE CASCADE,
            model_name TEXT NOT NULL,
            selected_index INTEGER,
            expected_index INTEGER,
            matches_expected INTEGER NOT NULL DEFAULT 0,
            suggested_answer TEXT,
            error TEXT,
            UNIQUE (question_id, model_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_extracted_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extracted_images (
            id INTEGER PRIMARY KEY,
            source_file TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            image_path TEXT NOT NULL,
            s3_url TEXT,
            question_number INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_extracted_images_source \
         ON extracted_images(source_file, page_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
