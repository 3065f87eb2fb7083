//! Pipeline error taxonomy
//!
//! Every component folds its failures into [`ServiceError`] instead of
//! letting provider or driver errors cross module boundaries. A request
//! stops at the first failure; there are no retries and no fallback
//! models.

use thiserror::Error;

/// Uniform failure type for the query pipeline
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid startup configuration (fatal before serving)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure, timeout, or non-2xx from the completion endpoint
    #[error("completion request failed: {0}")]
    Transport(String),

    /// Model response did not contain a recognizable SELECT statement
    #[error("no SQL statement found in model response: {0}")]
    Extraction(String),

    /// SQL execution failed inside the database driver
    #[error("database error: {0}")]
    Database(String),

    /// Explanation was not attempted because the query step already failed
    #[error("explanation skipped: {0}")]
    Skipped(String),
}

impl ServiceError {
    /// Stable tag for logging and API error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Config(_) => "config",
            ServiceError::Transport(_) => "transport",
            ServiceError::Extraction(_) => "extraction",
            ServiceError::Database(_) => "database",
            ServiceError::Skipped(_) => "skipped",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Database(err.to_string())
    }
}
