//! # QVD Common Library
//!
//! Shared code for the question verification dashboard:
//! - Error type used across crates
//! - Question status model and the aggregate status rule
//! - Bootstrap configuration (TOML + CLI/env overrides)
//! - Database schema initialization and row models

pub mod config;
pub mod db;
pub mod error;
pub mod status;

pub use error::{Error, Result};
pub use status::{aggregate_status, QuestionStatus};
