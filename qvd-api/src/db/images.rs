//! Extracted-image queries and question image columns

use qvd_common::db::ExtractedImage;
use sqlx::SqlitePool;

/// Distinct source files that have extracted images
pub async fn list_source_files(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT source_file FROM extracted_images ORDER BY source_file")
        .fetch_all(pool)
        .await
}

/// Images of one source file, optionally restricted to a page
///
/// Ordered by question number (unnumbered images last), then image path.
pub async fn images_for_file(
    pool: &SqlitePool,
    source_file: &str,
    page_number: Option<i64>,
) -> Result<Vec<ExtractedImage>, sqlx::Error> {
    sqlx::query_as::<_, ExtractedImage>(
        r#"
        SELECT id, source_file, page_number, image_path, s3_url, question_number
        FROM extracted_images
        WHERE source_file = ?1
          AND (?2 IS NULL OR page_number = ?2)
        ORDER BY question_number IS NULL, question_number, image_path
        "#,
    )
    .bind(source_file)
    .bind(page_number)
    .fetch_all(pool)
    .await
}

/// Distinct page numbers with images for a source file
pub async fn pages_for_file(pool: &SqlitePool, source_file: &str) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT page_number FROM extracted_images \
         WHERE source_file = ? ORDER BY page_number",
    )
    .bind(source_file)
    .fetch_all(pool)
    .await
}

/// Point a question at an image; marks the question as requiring one
///
/// Returns `false` when the question does not exist.
pub async fn set_question_image(
    pool: &SqlitePool,
    question_id: i64,
    image_url: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE enhanced_questions SET image_url = ?, requires_image = 1 WHERE id = ?",
    )
    .bind(image_url)
    .bind(question_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Detach a question's image; `requires_image` is left as is
///
/// Returns `false` when the question does not exist.
pub async fn clear_question_image(pool: &SqlitePool, question_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE enhanced_questions SET image_url = NULL WHERE id = ?")
        .bind(question_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
