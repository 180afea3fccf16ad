//! Direct review actions: overwrite a question's status

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use qvd_common::QuestionStatus;
use serde::Serialize;
use tracing::info;

use super::SuccessResponse;
use crate::db::edits;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub question_id: i64,
    pub new_status: QuestionStatus,
}

async fn mark(
    state: &AppState,
    question_id: i64,
    status: QuestionStatus,
) -> ApiResult<Json<SuccessResponse<StatusBody>>> {
    if !edits::set_status(&state.db, question_id, status).await? {
        return Err(ApiError::NotFound(format!(
            "Question {} not found",
            question_id
        )));
    }

    info!(question_id, status = %status, "Question marked");
    Ok(Json(SuccessResponse::new(StatusBody {
        question_id,
        new_status: status,
    })))
}

/// POST /api/question/:id/mark-corrected
pub async fn mark_corrected(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<StatusBody>>> {
    mark(&state, question_id, QuestionStatus::Corrected).await
}

/// POST /api/question/:id/mark-incorrect
pub async fn mark_incorrect(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<StatusBody>>> {
    mark(&state, question_id, QuestionStatus::Incorrect).await
}

/// POST /api/question/:id/mark-needs_review (also `mark-needs-review`)
pub async fn mark_needs_review(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<StatusBody>>> {
    mark(&state, question_id, QuestionStatus::NeedsReview).await
}

pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/api/question/:id/mark-corrected", post(mark_corrected))
        .route("/api/question/:id/mark-incorrect", post(mark_incorrect))
        .route("/api/question/:id/mark-needs_review", post(mark_needs_review))
        .route("/api/question/:id/mark-needs-review", post(mark_needs_review))
}
