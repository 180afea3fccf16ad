//! Integration tests for question edit reconciliation
//!
//! Run against a seeded in-memory database with a fake explanation model.
//! Concurrent-edit tests use a database file so edits get their own connections.

mod helpers;

use std::sync::Arc;

use helpers::*;
use qvd_api::services::reconciler::ChoiceInput;
use qvd_api::services::{QuestionReconciler, ReconcileError, UpdateQuestion};
use qvd_common::QuestionStatus;
use sqlx::SqlitePool;

fn reconciler(pool: &SqlitePool, generator: &Arc<FakeGenerator>) -> QuestionReconciler {
    QuestionReconciler::new(pool.clone(), generator.clone())
}

fn edit(text: &str, choices: &[(&str, bool)]) -> UpdateQuestion {
    UpdateQuestion {
        enhanced_text: Some(text.to_string()),
        category: Some("geography".to_string()),
        explanation: None,
        choices: Some(
            choices
                .iter()
                .map(|(text, correct)| ChoiceInput::new(*text, *correct))
                .collect(),
        ),
        requires_image: None,
    }
}

fn capital_choices(correct: usize) -> Vec<(&'static str, bool)> {
    ["Paris", "Lyon", "Nice", "Lille"]
        .into_iter()
        .enumerate()
        .map(|(i, text)| (text, i == correct))
        .collect()
}

#[tokio::test]
async fn test_unchanged_answer_keeps_explanation() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("unused"));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit("What is the capital city of France?", &capital_choices(0)),
        )
        .await
        .unwrap();

    assert!(!outcome.correct_changed);
    assert_eq!(outcome.explanation.as_deref(), Some("Paris is the capital."));
    assert_eq!(outcome.status, None);
    assert_eq!(generator.calls(), 0);

    assert_eq!(
        explanation_of(&pool, CAPITAL_QUESTION).await.as_deref(),
        Some("Paris is the capital.")
    );
    assert_eq!(status_of(&pool, CAPITAL_QUESTION).await, QuestionStatus::NeedsReview);

    let text: String = sqlx::query_scalar("SELECT enhanced_text FROM enhanced_questions WHERE id = ?")
        .bind(CAPITAL_QUESTION)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(text, "What is the capital city of France?");
}

#[tokio::test]
async fn test_moved_answer_generates_explanation_once() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("Lyon, surprisingly."));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit("What is the capital of France?", &capital_choices(1)),
        )
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(outcome.correct_changed);
    assert_eq!(outcome.explanation.as_deref(), Some("Lyon, surprisingly."));
    assert_eq!(
        explanation_of(&pool, CAPITAL_QUESTION).await.as_deref(),
        Some("Lyon, surprisingly.")
    );

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("'Lyon' is the correct answer"));
    assert!(prompt.contains("1. Paris\n2. Lyon\n3. Nice\n4. Lille"));

    // c and d picked 1: two of four
    assert_eq!(outcome.status, Some(QuestionStatus::NeedsReview));
    let rows = verification_rows(&pool, CAPITAL_QUESTION).await;
    assert!(rows.iter().all(|r| r.expected_index == Some(1)));
    let matching: Vec<&str> = rows
        .iter()
        .filter(|r| r.matches_expected)
        .map(|r| r.model_name.as_str())
        .collect();
    assert_eq!(matching, vec!["model-c", "model-d"]);
}

#[tokio::test]
async fn test_all_models_matching_is_verified() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("Y it is."));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(PAIR_QUESTION, edit("Pick X", &[("X", false), ("Y", true)]))
        .await
        .unwrap();

    assert_eq!(outcome.status, Some(QuestionStatus::Verified));
    assert_eq!(status_of(&pool, PAIR_QUESTION).await, QuestionStatus::Verified);
}

#[tokio::test]
async fn test_no_model_matching_is_incorrect() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("Lille."));

    reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit("What is the capital of France?", &capital_choices(3)),
        )
        .await
        .unwrap();

    assert_eq!(status_of(&pool, CAPITAL_QUESTION).await, QuestionStatus::Incorrect);
}

#[tokio::test]
async fn test_no_verification_results_is_incorrect() {
    let pool = seeded_pool().await;
    sqlx::query("DELETE FROM verification_results WHERE question_id = ?")
        .bind(PAIR_QUESTION)
        .execute(&pool)
        .await
        .unwrap();
    let generator = Arc::new(FakeGenerator::replying("Y."));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(PAIR_QUESTION, edit("Pick X", &[("X", false), ("Y", true)]))
        .await
        .unwrap();

    assert_eq!(outcome.status, Some(QuestionStatus::Incorrect));
}

#[tokio::test]
async fn test_majority_after_move_is_likely_correct() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("C is right."));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(
            LETTER_QUESTION,
            edit(
                "Which letter comes second?",
                &[("A", false), ("B", false), ("C", true), ("D", false)],
            ),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, Some(QuestionStatus::LikelyCorrect));
    assert_eq!(status_of(&pool, LETTER_QUESTION).await, QuestionStatus::LikelyCorrect);

    let rows = verification_rows(&pool, LETTER_QUESTION).await;
    assert_eq!(rows.iter().filter(|r| r.matches_expected).count(), 3);
    assert!(rows.iter().all(|r| r.expected_index == Some(2)));
}

#[tokio::test]
async fn test_missing_choices_is_rejected_without_writes() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("unused"));
    let update = UpdateQuestion {
        choices: None,
        ..edit("Rewritten", &[])
    };

    let result = reconciler(&pool, &generator)
        .reconcile_update(CAPITAL_QUESTION, update)
        .await;

    assert!(matches!(result, Err(ReconcileError::Validation(_))));
    assert_eq!(generator.calls(), 0);

    let text: String = sqlx::query_scalar("SELECT enhanced_text FROM enhanced_questions WHERE id = ?")
        .bind(CAPITAL_QUESTION)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(text, "What is the capital of France?");
    assert_eq!(choices_of(&pool, CAPITAL_QUESTION).await.len(), 4);
}

#[tokio::test]
async fn test_supplied_explanation_wins_over_generation() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("generated"));
    let update = UpdateQuestion {
        explanation: Some("Reviewer wrote this.".to_string()),
        ..edit("What is the capital of France?", &capital_choices(1))
    };

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(CAPITAL_QUESTION, update)
        .await
        .unwrap();

    assert_eq!(generator.calls(), 0);
    assert_eq!(outcome.explanation.as_deref(), Some("Reviewer wrote this."));
    assert_eq!(
        explanation_of(&pool, CAPITAL_QUESTION).await.as_deref(),
        Some("Reviewer wrote this.")
    );
    // Results are still re-scored
    assert_eq!(outcome.status, Some(QuestionStatus::NeedsReview));
}

#[tokio::test]
async fn test_repeated_edit_does_not_duplicate_choices() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("Lyon."));
    let reconciler = reconciler(&pool, &generator);

    for _ in 0..2 {
        reconciler
            .reconcile_update(
                CAPITAL_QUESTION,
                edit("What is the capital of France?", &capital_choices(1)),
            )
            .await
            .unwrap();
    }

    let choices = choices_of(&pool, CAPITAL_QUESTION).await;
    let texts: Vec<&str> = choices.iter().map(|c| c.choice_text.as_str()).collect();
    assert_eq!(texts, vec!["Paris", "Lyon", "Nice", "Lille"]);
    assert_eq!(choices.iter().filter(|c| c.is_correct).count(), 1);
    // Second pass sees no change
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_generation_failure_rolls_back() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::failing());

    let result = reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit("Edited text", &capital_choices(2)),
        )
        .await;

    assert!(matches!(result, Err(ReconcileError::ExplanationGeneration(_))));
    assert_eq!(generator.calls(), 1);

    let choices = choices_of(&pool, CAPITAL_QUESTION).await;
    assert!(choices[0].is_correct);
    assert_eq!(
        explanation_of(&pool, CAPITAL_QUESTION).await.as_deref(),
        Some("Paris is the capital.")
    );
    assert_eq!(status_of(&pool, CAPITAL_QUESTION).await, QuestionStatus::NeedsReview);
    let rows = verification_rows(&pool, CAPITAL_QUESTION).await;
    assert!(rows.iter().all(|r| r.expected_index == Some(0)));
}

#[tokio::test]
async fn test_rewritten_correct_text_counts_as_change() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("Paris, the capital."));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit(
                "What is the capital of France?",
                &[("Paris (city)", true), ("Lyon", false), ("Nice", false), ("Lille", false)],
            ),
        )
        .await
        .unwrap();

    assert!(outcome.correct_changed);
    assert_eq!(generator.calls(), 1);
    // a and b still match index 0
    assert_eq!(outcome.status, Some(QuestionStatus::NeedsReview));
}

#[tokio::test]
async fn test_clearing_correct_answer_skips_rescoring() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("unused"));

    let outcome = reconciler(&pool, &generator)
        .reconcile_update(
            CAPITAL_QUESTION,
            edit(
                "What is the capital of France?",
                &[("Paris", false), ("Lyon", false), ("Nice", false), ("Lille", false)],
            ),
        )
        .await
        .unwrap();

    assert!(outcome.correct_changed);
    assert_eq!(outcome.status, None);
    assert_eq!(generator.calls(), 0);
    assert_eq!(status_of(&pool, CAPITAL_QUESTION).await, QuestionStatus::NeedsReview);
}

#[tokio::test]
async fn test_unknown_question_is_not_found() {
    let pool = seeded_pool().await;
    let generator = Arc::new(FakeGenerator::replying("unused"));

    let result = reconciler(&pool, &generator)
        .reconcile_update(999, edit("Q", &[("A", true)]))
        .await;

    assert!(matches!(result, Err(ReconcileError::NotFound(999))));
}

#[tokio::test]
async fn test_requires_image_defaults_to_false() {
    let pool = seeded_pool().await;
    sqlx::query("UPDATE enhanced_questions SET requires_image = 1 WHERE id = ?")
        .bind(PAIR_QUESTION)
        .execute(&pool)
        .await
        .unwrap();
    let generator = Arc::new(FakeGenerator::replying("unused"));

    reconciler(&pool, &generator)
        .reconcile_update(PAIR_QUESTION, edit("Pick X", &[("X", true), ("Y", false)]))
        .await
        .unwrap();

    let requires_image: bool =
        sqlx::query_scalar("SELECT requires_image FROM enhanced_questions WHERE id = ?")
            .bind(PAIR_QUESTION)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!requires_image);
}

#[tokio::test]
async fn test_other_edit_committed_during_generation() {
    let (_dir, pool) = seeded_file_pool().await;
    let gated = Arc::new(GatedGenerator::replying("Lyon, surprisingly."));
    let slow = Arc::new(QuestionReconciler::new(pool.clone(), gated.clone()));

    let pending = tokio::spawn({
        let slow = slow.clone();
        async move {
            slow.reconcile_update(
                CAPITAL_QUESTION,
                edit("What is the capital of France?", &capital_choices(1)),
            )
            .await
        }
    });
    gated.entered().await;

    let generator = Arc::new(FakeGenerator::replying("unused"));
    let mut other = edit(
        "Which letter comes second?",
        &[("A", false), ("B", false), ("C", true), ("D", false)],
    );
    other.explanation = Some("C, after the edit.".to_string());
    reconciler(&pool, &generator)
        .reconcile_update(LETTER_QUESTION, other)
        .await
        .unwrap();

    gated.release();
    let outcome = pending.await.unwrap().unwrap();

    assert!(outcome.correct_changed);
    assert_eq!(outcome.explanation.as_deref(), Some("Lyon, surprisingly."));
    assert_eq!(outcome.status, Some(QuestionStatus::NeedsReview));
    assert_eq!(status_of(&pool, CAPITAL_QUESTION).await, QuestionStatus::NeedsReview);
    assert!(choices_of(&pool, CAPITAL_QUESTION).await[1].is_correct);

    assert_eq!(
        explanation_of(&pool, LETTER_QUESTION).await.as_deref(),
        Some("C, after the edit.")
    );
    assert_eq!(status_of(&pool, LETTER_QUESTION).await, QuestionStatus::LikelyCorrect);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_same_question_edited_during_generation_is_replanned() {
    let (_dir, pool) = seeded_file_pool().await;
    let gated = Arc::new(GatedGenerator::replying("Generated text"));
    let slow = Arc::new(QuestionReconciler::new(pool.clone(), gated.clone()));

    let pending = tokio::spawn({
        let slow = slow.clone();
        async move {
            slow.reconcile_update(
                CAPITAL_QUESTION,
                edit("What is the capital of France?", &capital_choices(1)),
            )
            .await
        }
    });
    gated.entered().await;

    // A reviewer lands the same answer move first, with their own explanation
    let generator = Arc::new(FakeGenerator::replying("unused"));
    let mut first = edit("What is the capital of France?", &capital_choices(1));
    first.explanation = Some("Reviewer text".to_string());
    let landed = reconciler(&pool, &generator)
        .reconcile_update(CAPITAL_QUESTION, first)
        .await
        .unwrap();
    assert_eq!(landed.status, Some(QuestionStatus::NeedsReview));

    gated.release();
    let outcome = pending.await.unwrap().unwrap();

    assert!(!outcome.correct_changed);
    assert_eq!(outcome.status, None);
    assert_eq!(outcome.explanation.as_deref(), Some("Reviewer text"));
    assert_eq!(
        explanation_of(&pool, CAPITAL_QUESTION).await.as_deref(),
        Some("Reviewer text")
    );

    let choices = choices_of(&pool, CAPITAL_QUESTION).await;
    assert_eq!(choices.len(), 4);
    assert!(choices[1].is_correct);
}
