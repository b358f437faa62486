use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Error body returned to HTTP clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: String,
}

/// Errors surfaced by the fulfillment engine's services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Destination stage is not reachable from the current stage. A
    /// same-stage drag is a silent skip upstream and never raises this.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The step4 approval gate was attempted by an actor without the
    /// approving role.
    #[error("Unauthorized transition: {0}")]
    UnauthorizedTransition(String),

    #[error("Assignment list must not be empty")]
    EmptyAssignment,

    /// A per-unit batch advance failed partway through. `updated` counts
    /// the items already written; callers reload order state instead of
    /// assuming rollback.
    #[error("Batch transition failed after {updated} item(s): {message}")]
    BatchFailure { updated: usize, message: String },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::BatchFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::EmptyAssignment
            | ServiceError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidTransition(_) | ServiceError::InvalidOperation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::UnauthorizedTransition(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_label(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable Entity",
            StatusCode::FORBIDDEN => "Forbidden",
            _ => "Internal Server Error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Database detail stays in the logs, not in client responses.
        let message = match &self {
            ServiceError::DatabaseError(e) => {
                tracing::error!(error = %e, "database failure surfaced to handler");
                "A database error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.error_label().to_string(),
            message,
            details: match &self {
                ServiceError::BatchFailure { updated, .. } => {
                    Some(json!({ "updated_items": updated }).to_string())
                }
                _ => None,
            },
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
