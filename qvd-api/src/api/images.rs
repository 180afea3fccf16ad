//! Question image attach / detach
//!
//! The attach endpoint takes either a JSON body naming an existing image URL or
//! a multipart form carrying the file itself in an `image` field. Which one is
//! decided from the request `Content-Type`.

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SuccessResponse;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::image_store::{object_key_for, ImageAttachment};
use crate::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct ImageUrlRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageBody {
    pub question_id: i64,
    pub image_url: Option<String>,
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Turn the request body into an [`ImageAttachment`]
async fn read_attachment(request: Request) -> ApiResult<ImageAttachment> {
    if !is_multipart(&request) {
        let Json(body) = Json::<ImageUrlRequest>::from_request(request, &()).await?;
        return body
            .image_url
            .filter(|url| !url.trim().is_empty())
            .map(ImageAttachment::Url)
            .ok_or_else(|| ApiError::BadRequest("No image URL provided".to_string()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
            .to_vec();

        return Ok(ImageAttachment::File {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::BadRequest("No image provided".to_string()))
}

/// POST /api/question/:id/image
pub async fn attach_image(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    request: Request,
) -> ApiResult<Json<SuccessResponse<ImageBody>>> {
    let attachment = read_attachment(request).await?;

    if db::questions::fetch_enhanced_question(&state.db, question_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!(
            "Question {} not found",
            question_id
        )));
    }

    let image_url = match attachment {
        ImageAttachment::Url(url) => url,
        ImageAttachment::File {
            file_name,
            content_type,
            bytes,
        } => {
            let store = state.image_store.as_ref().ok_or_else(|| {
                ApiError::Unavailable("Image storage is not configured".to_string())
            })?;
            let key = object_key_for(question_id, &file_name);
            store
                .put_object(&key, bytes, content_type.as_deref())
                .await?;
            store.public_url(&key)
        }
    };

    if !db::images::set_question_image(&state.db, question_id, &image_url).await? {
        return Err(ApiError::NotFound(format!(
            "Question {} not found",
            question_id
        )));
    }

    info!(question_id, image_url = %image_url, "Attached question image");
    Ok(Json(SuccessResponse::new(ImageBody {
        question_id,
        image_url: Some(image_url),
    })))
}

/// DELETE /api/question/:id/image
pub async fn detach_image(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<ImageBody>>> {
    if !db::images::clear_question_image(&state.db, question_id).await? {
        return Err(ApiError::NotFound(format!(
            "Question {} not found",
            question_id
        )));
    }

    info!(question_id, "Removed question image");
    Ok(Json(SuccessResponse::new(ImageBody {
        question_id,
        image_url: None,
    })))
}

pub fn image_routes() -> Router<AppState> {
    Router::new().route(
        "/api/question/:id/image",
        post(attach_image)
            .delete(detach_image)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}
