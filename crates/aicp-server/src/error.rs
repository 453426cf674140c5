//! API error responses.

use aicp_runtime::PipelineError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Endpoint not found")]
    NotFound,

    /// A pipeline run that ended without a result.
    #[error("{source}")]
    Query {
        question: String,
        source: PipelineError,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("Content-Type must be application/json".to_string())
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Query { question, source } => {
                let (status, error) = if source.is_rejection() {
                    (StatusCode::FORBIDDEN, "Query validation failed")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Query execution failed")
                };
                let details = match &source {
                    PipelineError::Rejected(rejection) => rejection.message.clone(),
                    other => other.to_string(),
                };
                (
                    status,
                    json!({
                        "success": false,
                        "error": error,
                        "reason": source.code(),
                        "stage": source.stage(),
                        "details": details,
                        "question": question,
                    }),
                )
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal server error" }),
                )
            }
            other => {
                let status = match &other {
                    ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
                    _ => StatusCode::NOT_FOUND,
                };
                (status, json!({ "success": false, "error": other.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}
