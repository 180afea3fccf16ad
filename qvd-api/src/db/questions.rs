//! Question listing and detail queries

use qvd_common::db::{EnhancedChoice, EnhancedQuestion, FileLocation, VerificationResult};
use qvd_common::QuestionStatus;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};

/// One row of the dashboard question list
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuestionSummary {
    pub id: i64,
    pub question_id: i64,
    pub enhanced_text: String,
    pub category: Option<String>,
    pub status: QuestionStatus,
    pub requires_image: bool,
    pub image_url: Option<String>,
    pub array_order: Option<i64>,
    /// `direct` or `duplicate`; only set when listing a single file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    pub representative_file_path: String,
    pub page: Option<i64>,
    pub original_question_number: Option<i64>,
    pub models_count: i64,
    pub matching_models: i64,
}

/// Everything the editor shows for one question
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    pub id: i64,
    pub enhanced_text: String,
    pub category: Option<String>,
    pub status: QuestionStatus,
    pub explanation: Option<String>,
    pub requires_image: bool,
    pub image_url: Option<String>,
    pub original_question_id: i64,
    pub representative_file_path: String,
    pub representative_page: Option<i64>,
    pub representative_question_number: Option<i64>,
    pub file_locations: Vec<FileLocation>,
    pub choices: Vec<String>,
    pub is_correct: Vec<bool>,
    pub models_count: usize,
    pub verification_results: Vec<VerificationResult>,
}

/// All enhanced questions, ordered by id
pub async fn list_questions(pool: &SqlitePool) -> Result<Vec<QuestionSummary>, sqlx::Error> {
    sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT
            eq.id,
            eq.question_id,
            eq.enhanced_text,
            eq.category,
            eq.status,
            eq.requires_image,
            eq.image_url,
            q.array_order,
            NULL AS source_type,
            q.file_path AS representative_file_path,
            q.page,
            q.original_question_number,
            (SELECT COUNT(DISTINCT vr.model_name) FROM verification_results vr
              WHERE vr.question_id = eq.id) AS models_count,
            (SELECT COUNT(*) FROM verification_results vr
              WHERE vr.question_id = eq.id AND vr.matches_expected = 1) AS matching_models
        FROM enhanced_questions eq
        JOIN questions q ON q.id = eq.question_id
        ORDER BY eq.id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Enhanced questions appearing in `file_path`, directly or as a duplicate
///
/// Location fields come from the occurrence in that file; rows are ordered by
/// position within the file.
pub async fn list_questions_in_file(
    pool: &SqlitePool,
    file_path: &str,
) -> Result<Vec<QuestionSummary>, sqlx::Error> {
    sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT
            eq.id,
            eq.question_id,
            eq.enhanced_text,
            eq.category,
            eq.status,
            eq.requires_image,
            eq.image_url,
            COALESCE(q_direct.array_order, d.array_order) AS array_order,
            CASE WHEN q_direct.id IS NOT NULL THEN 'direct' ELSE 'duplicate' END AS source_type,
            q.file_path AS representative_file_path,
            COALESCE(q_direct.page, d.page) AS page,
            COALESCE(q_direct.original_question_number, d.original_question_number)
                AS original_question_number,
            (SELECT COUNT(DISTINCT vr.model_name) FROM verification_results vr
              WHERE vr.question_id = eq.id) AS models_count,
            (SELECT COUNT(*) FROM verification_results vr
              WHERE vr.question_id = eq.id AND vr.matches_expected = 1) AS matching_models
        FROM enhanced_questions eq
        JOIN questions q ON q.id = eq.question_id
        LEFT JOIN questions q_direct
            ON q_direct.id = eq.question_id AND q_direct.file_path = ?1
        LEFT JOIN duplicates d
            ON d.representative_id = eq.question_id AND d.file_path = ?1
        WHERE q_direct.id IS NOT NULL OR d.representative_id IS NOT NULL
        ORDER BY COALESCE(q_direct.array_order, d.array_order), eq.id
        "#,
    )
    .bind(file_path)
    .fetch_all(pool)
    .await
}

/// Files containing at least one enhanced question (directly or as duplicate)
pub async fn list_files_with_enhanced_questions(
    pool: &SqlitePool,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT q.file_path
        FROM questions q
        JOIN enhanced_questions eq ON q.id = eq.question_id
        UNION
        SELECT d.file_path
        FROM duplicates d
        JOIN enhanced_questions eq ON d.representative_id = eq.question_id
        ORDER BY 1
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Every file path known to the question tables
pub async fn list_all_files(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT file_path FROM questions
        UNION
        SELECT file_path FROM duplicates
        ORDER BY 1
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_enhanced_question<'e, E>(
    executor: E,
    question_id: i64,
) -> Result<Option<EnhancedQuestion>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, EnhancedQuestion>(
        r#"
        SELECT id, question_id, enhanced_text, category, status, explanation,
               requires_image, image_url
        FROM enhanced_questions
        WHERE id = ?
        "#,
    )
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Choices in creation order
pub async fn fetch_choices<'e, E>(
    executor: E,
    question_id: i64,
) -> Result<Vec<EnhancedChoice>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, EnhancedChoice>(
        "SELECT choice_text, is_correct FROM enhanced_choices \
         WHERE enhanced_question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(executor)
    .await
}

pub async fn fetch_verification_results(
    pool: &SqlitePool,
    question_id: i64,
) -> Result<Vec<VerificationResult>, sqlx::Error> {
    sqlx::query_as::<_, VerificationResult>(
        r#"
        SELECT model_name, selected_index, expected_index, matches_expected,
               suggested_answer, error
        FROM verification_results
        WHERE question_id = ?
        ORDER BY model_name
        "#,
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}

/// Representative occurrence plus every duplicate occurrence of a question
pub async fn fetch_file_locations(
    pool: &SqlitePool,
    original_question_id: i64,
) -> Result<Vec<FileLocation>, sqlx::Error> {
    sqlx::query_as::<_, FileLocation>(
        r#"
        SELECT file_path, array_order, page, original_question_number,
               'representative' AS question_type
        FROM questions
        WHERE id = ?1
        UNION ALL
        SELECT file_path, array_order, page, original_question_number,
               'duplicate_rep' AS question_type
        FROM duplicates
        WHERE representative_id = ?1
        ORDER BY file_path, array_order
        "#,
    )
    .bind(original_question_id)
    .fetch_all(pool)
    .await
}

type Location = (String, Option<i64>, Option<i64>);

/// `(file_path, page, question_number)` to show as the question's location
///
/// When viewing a specific file, the duplicate occurrence in that file wins
/// over the representative's own location.
async fn representative_location(
    pool: &SqlitePool,
    original_question_id: i64,
    file_path: Option<&str>,
) -> Result<Option<Location>, sqlx::Error> {
    if let Some(file_path) = file_path {
        let duplicate: Option<Location> = sqlx::query_as(
            "SELECT file_path, page, original_question_number FROM duplicates \
             WHERE representative_id = ? AND file_path = ? ORDER BY array_order LIMIT 1",
        )
        .bind(original_question_id)
        .bind(file_path)
        .fetch_optional(pool)
        .await?;

        if duplicate.is_some() {
            tracing::debug!(
                original_question_id,
                file_path,
                "Using duplicate location for question"
            );
            return Ok(duplicate);
        }
    }

    sqlx::query_as("SELECT file_path, page, original_question_number FROM questions WHERE id = ?")
        .bind(original_question_id)
        .fetch_optional(pool)
        .await
}

/// Assemble the editor view; `None` when the question does not exist
pub async fn load_question_detail(
    pool: &SqlitePool,
    question_id: i64,
    file_path: Option<&str>,
) -> Result<Option<QuestionDetail>, sqlx::Error> {
    let Some(question) = fetch_enhanced_question(pool, question_id).await? else {
        return Ok(None);
    };

    let Some((representative_file_path, representative_page, representative_question_number)) =
        representative_location(pool, question.question_id, file_path).await?
    else {
        tracing::warn!(question_id, "No representative found for question");
        return Ok(None);
    };

    let file_locations = fetch_file_locations(pool, question.question_id).await?;
    let (choices, is_correct) = fetch_choices(pool, question_id)
        .await?
        .into_iter()
        .map(|c| (c.choice_text, c.is_correct))
        .unzip();
    let verification_results = fetch_verification_results(pool, question_id).await?;

    Ok(Some(QuestionDetail {
        id: question.id,
        enhanced_text: question.enhanced_text,
        category: question.category,
        status: question.status,
        explanation: question.explanation,
        requires_image: question.requires_image,
        image_url: question.image_url,
        original_question_id: question.question_id,
        representative_file_path,
        representative_page,
        representative_question_number,
        file_locations,
        choices,
        is_correct,
        models_count: verification_results.len(),
        verification_results,
    }))
}
