//! qvd-api library - Question Verification Dashboard backend
//!
//! Serves the review dashboard: question listing and detail, edits (with
//! explanation regeneration and status re-scoring), direct status marks,
//! question images, and the extracted-image browser.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use qvd_common::config::CacheConfig;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::{ExplanationGenerator, ImageBrowser, ImageStore, QuestionReconciler};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub reconciler: Arc<QuestionReconciler>,
    pub generator: Arc<dyn ExplanationGenerator>,
    /// `None` when no bucket is configured; uploads then answer 503
    pub image_store: Option<Arc<dyn ImageStore>>,
    pub images: Arc<ImageBrowser>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        generator: Arc<dyn ExplanationGenerator>,
        image_store: Option<Arc<dyn ImageStore>>,
        cache: CacheConfig,
    ) -> Self {
        let reconciler = Arc::new(QuestionReconciler::new(db.clone(), Arc::clone(&generator)));
        let images = Arc::new(ImageBrowser::new(db.clone(), cache));
        Self {
            db,
            reconciler,
            generator,
            image_store,
            images,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::question_routes())
        .merge(api::status_routes())
        .merge(api::image_routes())
        .merge(api::browser_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
