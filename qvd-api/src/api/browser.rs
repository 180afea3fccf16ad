//! Extracted-image browser and file list endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::questions;
use crate::error::{ApiError, ApiResult};
use crate::services::image_browser::{
    AvailablePagesResponse, FileImagesResponse, ImageFilesResponse, PageImagesResponse,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub file_path: Option<String>,
    pub page_number: Option<i64>,
    pub question_number: Option<i64>,
}

impl ImageQuery {
    fn file_path(&self) -> ApiResult<&str> {
        self.file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::BadRequest("file_path is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub file_paths: Vec<String>,
}

/// GET /api/image_files
pub async fn image_files(State(state): State<AppState>) -> ApiResult<Json<ImageFilesResponse>> {
    Ok(Json(state.images.image_files().await?))
}

/// GET /api/file_images?file_path=&page_number=&question_number=
pub async fn file_images(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> ApiResult<Json<FileImagesResponse>> {
    let Query(query) = query?;
    let file_path = query.file_path()?;

    Ok(Json(
        state
            .images
            .file_images(file_path, query.page_number, query.question_number)
            .await?,
    ))
}

/// GET /api/page_images?file_path=&page_number=&question_number=
pub async fn page_images(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> ApiResult<Json<PageImagesResponse>> {
    let Query(query) = query?;
    let file_path = query.file_path()?;
    let page_number = query
        .page_number
        .ok_or_else(|| ApiError::BadRequest("page_number is required".to_string()))?;

    Ok(Json(
        state
            .images
            .page_images(file_path, page_number, query.question_number)
            .await?,
    ))
}

/// GET /api/available_pages?file_path=
pub async fn available_pages(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> ApiResult<Json<AvailablePagesResponse>> {
    let Query(query) = query?;
    let file_path = query.file_path()?;

    Ok(Json(state.images.available_pages(file_path).await?))
}

/// GET /api/files
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FilesResponse>> {
    let file_paths = questions::list_all_files(&state.db).await?;
    Ok(Json(FilesResponse { file_paths }))
}

pub fn browser_routes() -> Router<AppState> {
    Router::new()
        .route("/api/image_files", get(image_files))
        .route("/api/file_images", get(file_images))
        .route("/api/page_images", get(page_images))
        .route("/api/available_pages", get(available_pages))
        .route("/api/files", get(list_files))
}
