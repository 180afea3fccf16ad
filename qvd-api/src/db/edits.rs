//! Write operations on enhanced questions
//!
//! Everything that runs as part of an edit takes the caller's transaction so
//! the whole decide-write sequence commits or rolls back together.

use qvd_common::QuestionStatus;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Open a transaction that takes the database write lock at `BEGIN`
///
/// A deferred transaction that reads first fails with `SQLITE_BUSY_SNAPSHOT`
/// on its first write if another connection committed in between.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Stored explanation of a question
///
/// Outer `None`: no such question. Inner `None`: question has no explanation.
pub async fn fetch_explanation<'e, E>(
    executor: E,
    question_id: i64,
) -> Result<Option<Option<String>>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT explanation FROM enhanced_questions WHERE id = ?")
            .bind(question_id)
            .fetch_optional(executor)
            .await?;

    Ok(row.map(|(explanation,)| explanation))
}

/// Overwrite the editable columns of a question
pub async fn update_content(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    enhanced_text: &str,
    category: &str,
    explanation: Option<&str>,
    requires_image: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE enhanced_questions
        SET enhanced_text = ?, category = ?, explanation = ?, requires_image = ?
        WHERE id = ?
        "#,
    )
    .bind(enhanced_text)
    .bind(category)
    .bind(explanation)
    .bind(requires_image)
    .bind(question_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Replace the full choice set; insertion order becomes display order
pub async fn replace_choices(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    choices: &[(String, bool)],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM enhanced_choices WHERE enhanced_question_id = ?")
        .bind(question_id)
        .execute(&mut **tx)
        .await?;

    for (text, is_correct) in choices {
        sqlx::query(
            "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) \
             VALUES (?, ?, ?)",
        )
        .bind(question_id)
        .bind(text)
        .bind(is_correct)
        .execute(&mut **tx)
        .await?;
    }

    tracing::debug!(question_id, count = choices.len(), "Replaced choices");
    Ok(())
}

/// Point every verification result of a question at a new expected answer
///
/// Returns the number of results touched.
pub async fn realign_verification_results(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    expected_index: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE verification_results
        SET expected_index = ?1,
            matches_expected = CASE WHEN selected_index = ?1 THEN 1 ELSE 0 END
        WHERE question_id = ?2
        "#,
    )
    .bind(expected_index)
    .bind(question_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// `(model_count, agreement_count)` over a question's verification results
pub async fn agreement_counts(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT model_name),
               COALESCE(SUM(CASE WHEN matches_expected = 1 THEN 1 ELSE 0 END), 0)
        FROM verification_results
        WHERE question_id = ?
        "#,
    )
    .bind(question_id)
    .fetch_one(&mut **tx)
    .await
}

/// Store a status inside an edit transaction
pub async fn store_status(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    status: QuestionStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE enhanced_questions SET status = ? WHERE id = ?")
        .bind(status)
        .bind(question_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Unconditional status overwrite for the direct review actions
///
/// Returns `false` when the question does not exist.
pub async fn set_status(
    pool: &SqlitePool,
    question_id: i64,
    status: QuestionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE enhanced_questions SET status = ? WHERE id = ?")
        .bind(status)
        .bind(question_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
