//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! mapping onto the wire format: every failure renders as
//! `{"error": "<string>"}` with a status from the four categories the API
//! exposes (validation 400, authorization 401/403, not-found 404,
//! unexpected 500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use bookbarter_core::ports::PortError;
use bookbarter_core::workflow::WorkflowError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A marketplace rule violation from the core workflow engine.
    #[error("{0}")]
    Rule(#[from] WorkflowError),

    /// Malformed or ineligible input detected in a handler.
    #[error("{0}")]
    Validation(String),

    /// Missing or unusable identity.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed to act on this entity.
    #[error("{0}")]
    Forbidden(String),

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Rule(rule) => (rule_status(rule), rule.to_string()),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Port(PortError::NotFound(message)) => {
                (StatusCode::NOT_FOUND, message.clone())
            }
            ApiError::Port(PortError::Conflict(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            // Everything else is an internal failure: log the detail, hide
            // it from the client.
            other => {
                error!("internal error: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Rule violations are validation errors, except for offering a book the
/// requester does not own, which is an authorization failure.
fn rule_status(rule: &WorkflowError) -> StatusCode {
    match rule {
        WorkflowError::OfferedNotOwned => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookbarter_core::domain::ExchangeStatus;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(
            status_of(ApiError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Unauthorized("who".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::NotFound("gone".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn port_errors_keep_their_category() {
        assert_eq!(
            status_of(PortError::NotFound("Book not found".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PortError::Conflict("no longer pending".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PortError::Unexpected("db down".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rule_violations_are_validation_errors_except_ownership() {
        assert_eq!(
            status_of(WorkflowError::SelfPurchase.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WorkflowError::AlreadyResolved(ExchangeStatus::Accepted).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WorkflowError::OfferedNotOwned.into()),
            StatusCode::FORBIDDEN
        );
    }
}
