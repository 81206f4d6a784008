use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Errors surfaced by the verification service's HTTP handlers.
///
/// Only infrastructure faults get an `AppError` variant — a cryptographically
/// invalid or revoked ticket is a first-class `valid:false` verdict, not an
/// error (see `service::handlers::verify`).
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Missing X-Tenant-Id")]
    MissingTenant,

    #[error("Invalid or missing X-Role")]
    InvalidRole,

    #[error("Role not permitted for this endpoint")]
    Forbidden,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::MissingTenant => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRole | AppError::Forbidden => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::MalformedInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Storage(_) => {
                tracing::error!(err = %self, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
