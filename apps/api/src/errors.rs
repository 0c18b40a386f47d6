use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Pipeline(e) => {
                tracing::error!("Pipeline error: {e}");
                match e {
                    PipelineError::BudgetExceeded { .. } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "BUDGET_EXCEEDED",
                        e.to_string(),
                    ),
                    PipelineError::Cancelled { .. } => {
                        (StatusCode::GATEWAY_TIMEOUT, "RUN_TIMEOUT", e.to_string())
                    }
                    PipelineError::SchemaValidation { .. } | PipelineError::Unparseable { .. } => {
                        (StatusCode::BAD_GATEWAY, "AGENT_OUTPUT_INVALID", e.to_string())
                    }
                    PipelineError::Completion { .. } => (
                        StatusCode::BAD_GATEWAY,
                        "LLM_ERROR",
                        "An AI processing error occurred".to_string(),
                    ),
                    PipelineError::Encode { .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                    ),
                }
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AgentKind;

    #[test]
    fn test_pipeline_errors_map_to_statuses() {
        let budget = AppError::from(PipelineError::BudgetExceeded {
            reason: "resume_parser needs ~900 tokens".to_string(),
        });
        assert_eq!(budget.parts().0, StatusCode::UNPROCESSABLE_ENTITY);

        let invalid = AppError::from(PipelineError::SchemaValidation {
            agent: AgentKind::ResumeParser,
            job_id: None,
            path: "skills".to_string(),
            message: "expected an array".to_string(),
        });
        let (status, code, message) = invalid.parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(code, "AGENT_OUTPUT_INVALID");
        assert!(message.contains("skills"));

        let timeout = AppError::from(PipelineError::Cancelled {
            stage: "resume_parser".to_string(),
        });
        assert_eq!(timeout.parts().0, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let (status, code, _) = AppError::Validation("resume_text is empty".to_string()).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
    }
}
