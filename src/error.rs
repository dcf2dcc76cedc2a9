// src/error.rs

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by every pipeline stage.
///
/// Only `Upstream` failures are considered transient; everything else is a
/// terminal property of the input or the local machine.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad input rejected before any external call was made.
    #[error("invalid input: {0}")]
    Validation(String),

    /// An external capability call failed or timed out.
    #[error("upstream call failed: {0}")]
    Upstream(String),

    /// An external response could not be parsed into the expected shape.
    #[error("upstream response did not match schema: {0}")]
    Schema(String),

    /// Local media read/write/encode/decode failure (ffmpeg, ffprobe).
    #[error("media processing failed: {0}")]
    Media(String),

    /// Filesystem failure while managing workspaces or published artifacts.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Whether a retry at the orchestration layer could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Upstream(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Schema(_) => "schema",
            PipelineError::Media(_) => "media",
            PipelineError::Storage(_) => "storage",
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PipelineError::Upstream(format!("request timed out: {}", e))
        } else {
            PipelineError::Upstream(e.to_string())
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Schema(_)
            | PipelineError::Media(_)
            | PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
