//! Service layer: edit reconciliation, explanation generation, image storage
//! and the cached image browser

pub mod explanation;
pub mod image_browser;
pub mod image_store;
pub mod reconciler;

pub use explanation::{ExplanationGenerator, GeminiClient, GenerationError};
pub use image_browser::ImageBrowser;
pub use image_store::{ImageAttachment, ImageStore, ImageStoreError, S3ImageStore};
pub use reconciler::{QuestionReconciler, ReconcileError, ReconcileOutcome, UpdateQuestion};
