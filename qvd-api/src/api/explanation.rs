//! On-demand explanation generation for the editor

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use super::questions::ExplanationBody;
use super::SuccessResponse;
use crate::error::{ApiError, ApiResult};
use crate::services::explanation::{ExplanationPrompt, PromptStyle};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateExplanationRequest {
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub choices: Vec<String>,
    pub correct_index: Option<usize>,
}

/// POST /api/generate_explanation
///
/// Nothing is stored; the editor decides whether to keep the text.
pub async fn generate_explanation(
    State(state): State<AppState>,
    payload: Result<Json<GenerateExplanationRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse<ExplanationBody>>> {
    let Json(request) = payload?;

    let correct_index = request
        .correct_index
        .ok_or_else(|| ApiError::BadRequest("correct_index is required".to_string()))?;
    let prompt = ExplanationPrompt::new(&request.question_text, &request.choices, correct_index)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "question_text, choices and a valid correct_index are required".to_string(),
            )
        })?;

    let explanation = state
        .generator
        .generate(&prompt.render(PromptStyle::Standalone))
        .await?;

    Ok(Json(SuccessResponse::new(ExplanationBody {
        explanation: Some(explanation),
    })))
}
