//! Question status model
//!
//! The status column of `enhanced_questions` holds one of five labels.
//! `corrected` is only set by a reviewer; the others are also produced by
//! [`aggregate_status`] after an edit moves the correct answer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Review status of an enhanced question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionStatus {
    Verified,
    LikelyCorrect,
    NeedsReview,
    Incorrect,
    Corrected,
}

impl QuestionStatus {
    /// Database / wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Verified => "verified",
            QuestionStatus::LikelyCorrect => "likely_correct",
            QuestionStatus::NeedsReview => "needs_review",
            QuestionStatus::Incorrect => "incorrect",
            QuestionStatus::Corrected => "corrected",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive a question's status from model agreement.
///
/// `model_count` is the number of distinct models with a verification result,
/// `agreement_count` the number of results matching the expected answer.
///
/// With no results at all the first two arms cannot fire and the
/// `agreement_count == 0` arm yields `Incorrect`.
pub fn aggregate_status(model_count: i64, agreement_count: i64) -> QuestionStatus {
    if model_count > 0 && agreement_count == model_count {
        QuestionStatus::Verified
    } else if model_count > 0 && agreement_count * 2 > model_count {
        // agreement_count > model_count / 2 without integer truncation
        QuestionStatus::LikelyCorrect
    } else if agreement_count == 0 {
        QuestionStatus::Incorrect
    } else {
        QuestionStatus::NeedsReview
    }
}
