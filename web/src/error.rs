//! Error types for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. The taxonomy is
//! deliberately small:
//!
//! - validation failures carry a structured field-error list and map to 400
//! - business-rule failures carry a human-readable reason and map to 400
//! - missing resources map to 404
//! - everything else is a 500 whose detail is logged server-side and never
//!   exposed to the caller

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// A single invalid or missing request field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending request field.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type for web handlers.
///
/// Implements [`IntoResponse`] so handlers can return
/// `Result<Json<T>, AppError>` and rely on `?`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Field-level detail, only populated for validation errors.
    fields: Vec<FieldError>,
    /// Internal cause, logged on 5xx and never serialized.
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error with an explicit status and message.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            fields: Vec::new(),
            source: None,
        }
    }

    /// Attach the underlying cause for server-side logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request carrying a business-rule reason.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// 400 Bad Request carrying a structured field-error list.
    #[must_use]
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let mut err = Self::new(StatusCode::BAD_REQUEST, "Validation failed".to_string());
        err.fields = fields;
        err
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into())
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into())
    }

    /// 404 Not Found for a named resource.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{resource} not found"))
    }

    /// 500 Internal Server Error with a generic caller-facing message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The caller-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Field-level validation detail, empty unless built via [`Self::validation`].
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Caller-facing body for plain errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Caller-facing body for validation errors.
#[derive(Debug, Serialize)]
struct ValidationBody {
    errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        if self.fields.is_empty() {
            (self.status, Json(ErrorBody { error: self.message })).into_response()
        } else {
            (self.status, Json(ValidationBody { errors: self.fields })).into_response()
        }
    }
}

/// Convert `anyhow::Error` to a generic 500.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("Server error").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_display() {
        let err = AppError::bad_request("Cart is empty");
        assert_eq!(err.to_string(), "[400 Bad Request] Cart is empty");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_names_resource() {
        let err = AppError::not_found("Order");
        assert_eq!(err.message(), "Order not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_carries_fields() {
        let err =
            AppError::validation(vec![FieldError::new("amount", "Amount must be at least 1")]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.fields().len(), 1);
        assert_eq!(err.fields()[0].field, "amount");
    }

    #[test]
    fn test_internal_hides_source() {
        let err =
            AppError::internal("Server error").with_source(anyhow::anyhow!("connection refused"));
        assert_eq!(err.message(), "Server error");
        assert!(std::error::Error::source(&err).is_some());
    }
}
