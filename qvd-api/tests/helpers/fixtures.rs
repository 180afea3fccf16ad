//! Seeded test databases
//!
//! Three enhanced questions:
//! - `CAPITAL_QUESTION` (10): answer "Paris" at 0; models a/b picked 0, c/d picked 1.
//!   Appears in `jsons/exam-a.json` and, as a duplicate, in `jsons/exam-b.json`.
//! - `LETTER_QUESTION` (20): answer at 1; models a/b/c picked 2, d picked 1.
//! - `PAIR_QUESTION` (30): answer at 0; both models picked 1. No explanation.

use qvd_common::db::{EnhancedChoice, VerificationResult};
use qvd_common::QuestionStatus;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const CAPITAL_QUESTION: i64 = 10;
pub const LETTER_QUESTION: i64 = 20;
pub const PAIR_QUESTION: i64 = 30;

pub async fn seeded_pool() -> SqlitePool {
    let pool = qvd_common::db::connect_in_memory()
        .await
        .expect("Should open in-memory database");
    seed(&pool).await;
    pool
}

/// Seeded database file with several connections
///
/// Keep the returned directory alive for as long as the pool is used.
pub async fn seeded_file_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Should create temp dir");
    let url = format!("sqlite://{}", dir.path().join("qvd.db").display());
    let pool = qvd_common::db::init_database(&url, 4)
        .await
        .expect("Should open database file");
    seed(&pool).await;
    (dir, pool)
}

pub async fn seed(pool: &SqlitePool) {
    let statements = [
        // Original questions
        "INSERT INTO questions (id, file_path, page, original_question_number, array_order, question_text) \
         VALUES (1, 'jsons/exam-a.json', 1, 1, 0, 'capital of france')",
        "INSERT INTO questions (id, file_path, page, original_question_number, array_order, question_text) \
         VALUES (2, 'jsons/exam-a.json', 1, 2, 1, 'second letter')",
        "INSERT INTO questions (id, file_path, page, original_question_number, array_order, question_text) \
         VALUES (3, 'jsons/exam-b.json', 3, 7, 0, 'pick x')",
        "INSERT INTO duplicates (id, representative_id, file_path, page, original_question_number, array_order) \
         VALUES (1, 1, 'jsons/exam-b.json', 5, 9, 1)",
        // Enhanced questions
        "INSERT INTO enhanced_questions (id, question_id, enhanced_text, category, status, explanation) \
         VALUES (10, 1, 'What is the capital of France?', 'geography', 'needs_review', 'Paris is the capital.')",
        "INSERT INTO enhanced_questions (id, question_id, enhanced_text, category, status, explanation) \
         VALUES (20, 2, 'Which letter comes second?', 'alphabet', 'incorrect', 'B follows A.')",
        "INSERT INTO enhanced_questions (id, question_id, enhanced_text, category, status) \
         VALUES (30, 3, 'Pick X', 'misc', 'incorrect')",
        // Choices
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (10, 'Paris', 1)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (10, 'Lyon', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (10, 'Nice', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (10, 'Lille', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (20, 'A', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (20, 'B', 1)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (20, 'C', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (20, 'D', 0)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (30, 'X', 1)",
        "INSERT INTO enhanced_choices (enhanced_question_id, choice_text, is_correct) VALUES (30, 'Y', 0)",
        // Verification results
        "INSERT INTO verification_results (question_id, model_name, selected_index, expected_index, matches_expected) \
         VALUES (10, 'model-a', 0, 0, 1), (10, 'model-b', 0, 0, 1), (10, 'model-c', 1, 0, 0), (10, 'model-d', 1, 0, 0)",
        "INSERT INTO verification_results (question_id, model_name, selected_index, expected_index, matches_expected) \
         VALUES (20, 'model-a', 2, 1, 0), (20, 'model-b', 2, 1, 0), (20, 'model-c', 2, 1, 0), (20, 'model-d', 1, 1, 1)",
        "INSERT INTO verification_results (question_id, model_name, selected_index, expected_index, matches_expected) \
         VALUES (30, 'model-a', 1, 0, 0), (30, 'model-b', 1, 0, 0)",
        // Extracted images: exam-a recorded under its short name
        "INSERT INTO extracted_images (id, source_file, page_number, image_path, s3_url, question_number) \
         VALUES (1, 'exam-a', 1, 'exam-a/p1_b.png', 'https://cdn.test/exam-a/p1_b.png', NULL)",
        "INSERT INTO extracted_images (id, source_file, page_number, image_path, s3_url, question_number) \
         VALUES (2, 'exam-a', 1, 'exam-a/p1_a.png', 'https://cdn.test/exam-a/p1_a.png', 1)",
        "INSERT INTO extracted_images (id, source_file, page_number, image_path, s3_url, question_number) \
         VALUES (3, 'exam-a', 2, 'exam-a/p2_a.png', 'https://cdn.test/exam-a/p2_a.png', 3)",
        "INSERT INTO extracted_images (id, source_file, page_number, image_path, s3_url, question_number) \
         VALUES (4, 'jsons/exam-b.json', 3, 'exam-b/p3_a.png', 'https://cdn.test/exam-b/p3_a.png', 7)",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .expect("Should seed test data");
    }
}

pub async fn choices_of(pool: &SqlitePool, question_id: i64) -> Vec<EnhancedChoice> {
    qvd_api::db::questions::fetch_choices(pool, question_id)
        .await
        .expect("Should read choices")
}

pub async fn explanation_of(pool: &SqlitePool, question_id: i64) -> Option<String> {
    sqlx::query_scalar("SELECT explanation FROM enhanced_questions WHERE id = ?")
        .bind(question_id)
        .fetch_one(pool)
        .await
        .expect("Should read explanation")
}

pub async fn status_of(pool: &SqlitePool, question_id: i64) -> QuestionStatus {
    sqlx::query_scalar("SELECT status FROM enhanced_questions WHERE id = ?")
        .bind(question_id)
        .fetch_one(pool)
        .await
        .expect("Should read status")
}

pub async fn verification_rows(pool: &SqlitePool, question_id: i64) -> Vec<VerificationResult> {
    qvd_api::db::questions::fetch_verification_results(pool, question_id)
        .await
        .expect("Should read verification results")
}
