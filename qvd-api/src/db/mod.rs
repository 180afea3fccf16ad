//! Database access for the dashboard API

pub mod edits;
pub mod images;
pub mod questions;
