//! Error types for the REST API server

use crate::error::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Invalid parameter in request
    InvalidParameter(String),
    /// A record source could not be read
    SourceUnavailable(String),
    /// Source rows do not match the expected schema
    SchemaMismatch(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
            ApiError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidParameter(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidParameter", msg.clone())
            }
            ApiError::SourceUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "SourceUnavailable", msg.clone())
            }
            ApiError::SchemaMismatch(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SchemaMismatch",
                msg.clone(),
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::SourceRetrieval { .. } => ApiError::SourceUnavailable(err.to_string()),
            PipelineError::SchemaMismatch { .. } => ApiError::SchemaMismatch(err.to_string()),
        }
    }
}
