use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("client {0} not found")]
    NotFound(i64),

    #[error("text generation upstream error: {0}")]
    Upstream(String),

    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Upstream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
