use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::ServiceError;
use crate::matching::error::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Similarity index error: {0}")]
    Index(String),

    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ProfileEmbedding(e) => AppError::Service(e),
            PipelineError::Query(e) => AppError::Index(e.to_string()),
            PipelineError::InternalConsistency(id) => AppError::InternalConsistency(format!(
                "retrieved id '{id}' is not part of the job corpus"
            )),
            PipelineError::DuplicateJobId(id) => AppError::Validation(format!(
                "job id '{id}' is used by more than one distinct record"
            )),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Service(e) => {
                tracing::error!("Model service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "SERVICE_ERROR",
                    "The embedding or language model service failed".to_string(),
                )
            }
            AppError::Index(msg) => {
                tracing::error!("Similarity index error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INDEX_ERROR",
                    "The similarity query failed".to_string(),
                )
            }
            AppError::InternalConsistency(msg) => {
                tracing::error!("Internal consistency error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_CONSISTENCY_ERROR",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
