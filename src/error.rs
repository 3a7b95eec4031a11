// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::migrations::BackfillError;

/// Generic message for failures the client cannot act on
pub const CONTACT_ADMIN: &str = "Something went wrong please contact admin";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<BackfillError> for ApiError {
    fn from(err: BackfillError) -> Self {
        if err.is_invalid_input() {
            return ApiError::bad_request(err.to_string());
        }

        // Log the real cause but return the generic message
        match &err {
            BackfillError::PartialCommit { failures, summary, .. } => {
                for failure in failures {
                    tracing::error!(
                        "Batch {} ({} writes) was not committed: {}",
                        failure.batch,
                        failure.writes,
                        failure.source
                    );
                }
                tracing::error!("Colour backfill partially applied: {} ({:?})", err, summary);
            }
            _ => tracing::error!("Error while running colour backfill: {}", err),
        }
        ApiError::service_unavailable(CONTACT_ADMIN)
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StoreError;

    #[test]
    fn invalid_batch_size_is_a_bad_request() {
        let err: ApiError = BackfillError::InvalidBatchSize { size: 0, max: 500 }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_hide_behind_service_unavailable() {
        let err: ApiError =
            BackfillError::Fetch(StoreError::Unavailable("connection refused".into())).into();

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), CONTACT_ADMIN);
        assert_eq!(err.to_json()["code"], "SERVICE_UNAVAILABLE");
    }
}
