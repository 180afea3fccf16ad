//! Question list, detail and edit endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SuccessResponse;
use crate::db::questions::{self, QuestionDetail, QuestionSummary};
use crate::error::{ApiError, ApiResult};
use crate::services::UpdateQuestion;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FileFilter {
    pub file_path: Option<String>,
}

impl FileFilter {
    /// Blank `file_path` means no filter
    fn path(&self) -> Option<&str> {
        self.file_path.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<QuestionSummary>,
    pub available_files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExplanationBody {
    pub explanation: Option<String>,
}

/// GET /api/questions?file_path=
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<FileFilter>,
) -> ApiResult<Json<QuestionListResponse>> {
    let questions = match filter.path() {
        Some(path) => questions::list_questions_in_file(&state.db, path).await?,
        None => questions::list_questions(&state.db).await?,
    };
    let available_files = questions::list_files_with_enhanced_questions(&state.db).await?;

    Ok(Json(QuestionListResponse {
        questions,
        available_files,
    }))
}

/// GET /api/question/:id?file_path=
pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Query(filter): Query<FileFilter>,
) -> ApiResult<Json<QuestionDetail>> {
    questions::load_question_detail(&state.db, question_id, filter.path())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Question {} not found", question_id)))
}

/// POST /api/question/:id
pub async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    payload: Result<Json<UpdateQuestion>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse<ExplanationBody>>> {
    let Json(update) = payload?;

    let outcome = state
        .reconciler
        .reconcile_update(question_id, update)
        .await?;

    info!(
        question_id,
        correct_changed = outcome.correct_changed,
        status = ?outcome.status,
        "Saved question edit"
    );

    Ok(Json(SuccessResponse::new(ExplanationBody {
        explanation: outcome.explanation,
    })))
}

pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/api/questions", get(list_questions))
        .route("/api/question/:id", get(get_question).post(update_question))
        .route(
            "/api/generate_explanation",
            post(super::explanation::generate_explanation),
        )
}
