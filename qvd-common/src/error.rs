//! Common error types for QVD

use thiserror::Error;

/// Common result type for QVD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the QVD crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration missing or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}
