//! Database row models

use serde::{Deserialize, Serialize};

use crate::QuestionStatus;

/// Curated version of an extracted question
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnhancedQuestion {
    pub id: i64,
    /// Original (representative) question this was derived from
    pub question_id: i64,
    pub enhanced_text: String,
    pub category: Option<String>,
    pub status: QuestionStatus,
    pub explanation: Option<String>,
    pub requires_image: bool,
    pub image_url: Option<String>,
}

/// One answer option of an enhanced question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnhancedChoice {
    pub choice_text: String,
    pub is_correct: bool,
}

/// One model's answer for an enhanced question
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationResult {
    pub model_name: String,
    pub selected_index: Option<i64>,
    pub expected_index: Option<i64>,
    pub matches_expected: bool,
    pub suggested_answer: Option<String>,
    pub error: Option<String>,
}

/// Where a question appears in a source file
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileLocation {
    pub file_path: String,
    pub array_order: Option<i64>,
    pub page: Option<i64>,
    #[sqlx(rename = "original_question_number")]
    pub question_number: Option<i64>,
    /// `representative` or `duplicate_rep`
    pub question_type: String,
}

/// Image extracted from a source file
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtractedImage {
    pub id: i64,
    pub source_file: String,
    pub page_number: i64,
    pub image_path: String,
    pub s3_url: Option<String>,
    pub question_number: Option<i64>,
}
