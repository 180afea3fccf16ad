//! Question edit reconciliation
//!
//! Saving an edited question does more than overwrite columns. When the edit
//! moves the correct answer (different position, or different text at the same
//! position) the explanation may need regenerating, every model's verification
//! result must be re-scored against the new answer, and the question's status
//! recomputed from the re-scored set.
//!
//! [`QuestionReconciler`] plans the edit and calls the generator without
//! holding a database lock. The writes then run in one write-locking
//! transaction that re-reads the stored question first; if it changed while
//! the explanation was being generated, the plan is rebuilt from what is
//! stored now.

use qvd_common::db::EnhancedChoice;
use qvd_common::{aggregate_status, QuestionStatus};
use serde::Deserialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::explanation::{ExplanationGenerator, ExplanationPrompt, GenerationError, PromptStyle};
use crate::db;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid update: {0}")]
    Validation(String),

    #[error("Question {0} not found")]
    NotFound(i64),

    #[error("Explanation generation failed: {0}")]
    ExplanationGeneration(#[from] GenerationError),

    #[error("Question {0} kept changing while the edit was applied")]
    Conflict(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Edit submitted by the dashboard
///
/// Fields are optional on the wire so that a missing field surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuestion {
    #[serde(default)]
    pub enhanced_text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<ChoiceInput>>,
    #[serde(default)]
    pub requires_image: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

impl ChoiceInput {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: Some(text.into()),
            is_correct,
        }
    }
}

/// An [`UpdateQuestion`] that passed validation
#[derive(Debug, Clone)]
struct ValidatedUpdate {
    enhanced_text: String,
    category: String,
    explanation: Option<String>,
    choices: Vec<(String, bool)>,
    requires_image: bool,
}

impl UpdateQuestion {
    fn validate(self) -> Result<ValidatedUpdate, ReconcileError> {
        let enhanced_text = self
            .enhanced_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ReconcileError::Validation("enhanced_text is required".into()))?;
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ReconcileError::Validation("category is required".into()))?;
        let choices = self
            .choices
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReconcileError::Validation("choices are required".into()))?;

        let choices = choices
            .into_iter()
            .enumerate()
            .map(|(i, choice)| match choice.text {
                Some(text) if !text.trim().is_empty() => Ok((text, choice.is_correct)),
                _ => Err(ReconcileError::Validation(format!(
                    "choice {} has no text",
                    i + 1
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedUpdate {
            enhanced_text,
            category,
            explanation: self.explanation,
            choices,
            requires_image: self.requires_image.unwrap_or(false),
        })
    }
}

/// Index of the first flag that is set
pub fn first_correct_index<I>(flags: I) -> Option<usize>
where
    I: IntoIterator<Item = bool>,
{
    flags.into_iter().position(|flag| flag)
}

/// Whether an edit changes which answer is correct
///
/// Same index but different text at that index counts as a change.
pub fn correct_answer_changed(
    previous: &[EnhancedChoice],
    previous_index: Option<usize>,
    next: &[(String, bool)],
    next_index: Option<usize>,
) -> bool {
    match (previous_index, next_index) {
        (Some(p), Some(n)) if p == n => previous
            .get(p)
            .map(|c| c.choice_text.as_str())
            != next.get(n).map(|(text, _)| text.as_str()),
        (p, n) => p != n,
    }
}

/// Where the saved explanation comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplanationPlan {
    /// Caller's text, stored verbatim
    UseSupplied(String),
    /// Ask the generator, using the choice at this index as the answer
    Generate(usize),
    KeepStored,
}

pub fn plan_explanation(
    supplied: Option<&str>,
    stored: Option<&str>,
    correct_changed: bool,
    new_correct_index: Option<usize>,
) -> ExplanationPlan {
    if let Some(text) = supplied.filter(|t| !t.is_empty()) {
        if Some(text) != stored {
            return ExplanationPlan::UseSupplied(text.to_string());
        }
    }

    match new_correct_index {
        Some(index) if correct_changed => ExplanationPlan::Generate(index),
        _ => ExplanationPlan::KeepStored,
    }
}

/// Result of a successful edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Explanation now stored on the question
    pub explanation: Option<String>,
    pub correct_changed: bool,
    /// Recomputed status, when the correct answer moved
    pub status: Option<QuestionStatus>,
}

/// Rounds of plan-then-write before an edit gives up with `Conflict`
const MAX_PLAN_ATTEMPTS: usize = 3;

/// Explanation and choices as stored
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredQuestion {
    explanation: Option<String>,
    choices: Vec<EnhancedChoice>,
}

async fn load_stored(
    conn: &mut SqliteConnection,
    question_id: i64,
) -> Result<Option<StoredQuestion>, sqlx::Error> {
    let Some(explanation) = db::edits::fetch_explanation(&mut *conn, question_id).await? else {
        return Ok(None);
    };
    let choices = db::questions::fetch_choices(&mut *conn, question_id).await?;
    Ok(Some(StoredQuestion {
        explanation,
        choices,
    }))
}

/// What an edit will do, given the stored question
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditPlan {
    next_index: Option<usize>,
    correct_changed: bool,
    explanation: ExplanationPlan,
}

fn plan_edit(update: &ValidatedUpdate, stored: &StoredQuestion) -> EditPlan {
    let previous_index = first_correct_index(stored.choices.iter().map(|c| c.is_correct));
    let next_index = first_correct_index(update.choices.iter().map(|(_, correct)| *correct));
    let correct_changed =
        correct_answer_changed(&stored.choices, previous_index, &update.choices, next_index);
    let explanation = plan_explanation(
        update.explanation.as_deref(),
        stored.explanation.as_deref(),
        correct_changed,
        next_index,
    );

    EditPlan {
        next_index,
        correct_changed,
        explanation,
    }
}

pub struct QuestionReconciler {
    db: SqlitePool,
    generator: Arc<dyn ExplanationGenerator>,
}

impl QuestionReconciler {
    pub fn new(db: SqlitePool, generator: Arc<dyn ExplanationGenerator>) -> Self {
        Self { db, generator }
    }

    /// Apply an edit to question `question_id`
    ///
    /// Nothing is written unless every step succeeds.
    pub async fn reconcile_update(
        &self,
        question_id: i64,
        update: UpdateQuestion,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let update = update.validate()?;
        // (correct index, text) of the last generated explanation
        let mut generated: Option<(usize, String)> = None;

        for attempt in 1..=MAX_PLAN_ATTEMPTS {
            let planned_from = {
                let mut conn = self.db.acquire().await?;
                let stored = load_stored(&mut conn, question_id).await?;
                stored.ok_or(ReconcileError::NotFound(question_id))?
            };
            let plan = plan_edit(&update, &planned_from);

            debug!(
                question_id,
                attempt,
                next_index = ?plan.next_index,
                correct_changed = plan.correct_changed,
                "Planned edit"
            );

            if let ExplanationPlan::Generate(index) = plan.explanation {
                if !matches!(&generated, Some((done, _)) if *done == index) {
                    let text = self.generate_explanation(&update, index).await?;
                    info!(question_id, "Generated new explanation after answer change");
                    generated = Some((index, text));
                }
            }

            let mut tx = db::edits::begin_write(&self.db).await?;
            let current = load_stored(&mut tx, question_id)
                .await?
                .ok_or(ReconcileError::NotFound(question_id))?;

            let plan = if current == planned_from {
                plan
            } else {
                debug!(question_id, "Question changed during planning, re-planning");
                plan_edit(&update, &current)
            };

            let explanation = match &plan.explanation {
                ExplanationPlan::UseSupplied(text) => Some(text.clone()),
                ExplanationPlan::KeepStored => current.explanation,
                ExplanationPlan::Generate(index) => match &generated {
                    Some((done, text)) if done == index => Some(text.clone()),
                    _ => {
                        // Dropping `tx` rolls it back
                        debug!(question_id, index, "New plan needs another explanation");
                        continue;
                    }
                },
            };

            let status = self
                .apply(&mut tx, question_id, &update, &plan, explanation.as_deref())
                .await?;
            tx.commit().await?;

            info!(
                question_id,
                correct_changed = plan.correct_changed,
                "Question updated"
            );
            return Ok(ReconcileOutcome {
                explanation,
                correct_changed: plan.correct_changed,
                status,
            });
        }

        warn!(question_id, "Giving up on edit after {} attempts", MAX_PLAN_ATTEMPTS);
        Err(ReconcileError::Conflict(question_id))
    }

    async fn generate_explanation(
        &self,
        update: &ValidatedUpdate,
        index: usize,
    ) -> Result<String, ReconcileError> {
        let texts: Vec<String> = update.choices.iter().map(|(text, _)| text.clone()).collect();
        let prompt = ExplanationPrompt::new(&update.enhanced_text, &texts, index)
            .ok_or_else(|| ReconcileError::Validation("correct choice out of range".into()))?;

        Ok(self
            .generator
            .generate(&prompt.render(PromptStyle::AfterEdit))
            .await?)
    }

    /// Write the edit; returns the recomputed status when results were re-scored
    async fn apply(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        question_id: i64,
        update: &ValidatedUpdate,
        plan: &EditPlan,
        explanation: Option<&str>,
    ) -> Result<Option<QuestionStatus>, sqlx::Error> {
        db::edits::update_content(
            tx,
            question_id,
            &update.enhanced_text,
            &update.category,
            explanation,
            update.requires_image,
        )
        .await?;
        db::edits::replace_choices(tx, question_id, &update.choices).await?;

        let (true, Some(index)) = (plan.correct_changed, plan.next_index) else {
            return Ok(None);
        };

        let index = index as i64;
        let realigned = db::edits::realign_verification_results(tx, question_id, index).await?;
        let (model_count, agreement_count) = db::edits::agreement_counts(tx, question_id).await?;
        let status = aggregate_status(model_count, agreement_count);
        db::edits::store_status(tx, question_id, status).await?;

        info!(
            question_id,
            expected_index = index,
            realigned,
            model_count,
            agreement_count,
            status = %status,
            "Re-scored verification results"
        );
        Ok(Some(status))
    }
}
