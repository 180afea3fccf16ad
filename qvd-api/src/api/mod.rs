//! HTTP API handlers for qvd-api

pub mod browser;
pub mod explanation;
pub mod health;
pub mod images;
pub mod questions;
pub mod status;

pub use browser::browser_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use questions::question_routes;
pub use status::status_routes;

use serde::Serialize;

/// `{"status": "success", ...}` body shared by the write endpoints
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(body: T) -> Self {
        Self {
            status: "success",
            body,
        }
    }
}
