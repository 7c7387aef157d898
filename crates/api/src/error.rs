//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Workflow error.
    Workflow(WorkflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Workflow(err) => workflow_error_to_response(err),
        };

        let body = if errors.is_empty() {
            serde_json::json!({ "error": message })
        } else {
            serde_json::json!({ "error": message, "errors": errors })
        };
        (status, axum::Json(body)).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, String, Vec<String>) {
    match err {
        WorkflowError::Validation { message, errors } => {
            (StatusCode::UNPROCESSABLE_ENTITY, message, errors)
        }
        WorkflowError::TransitionRejected(_) => (StatusCode::CONFLICT, err.to_string(), Vec::new()),
        WorkflowError::OrderNotFound(_) | WorkflowError::CustomerNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string(), Vec::new())
        }
        WorkflowError::PaymentRejected(_) => {
            (StatusCode::PAYMENT_REQUIRED, err.to_string(), Vec::new())
        }
        _ => {
            tracing::error!(error = %err, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), Vec::new())
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}
