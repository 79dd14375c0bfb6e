use std::fmt;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Principal and token errors
    DuplicateIdentity,
    InvalidCredentials,
    InvalidToken,

    // Store errors
    StoreUnavailable(String),

    // Validation errors
    ValidationError(String),

    // Authorization errors
    Unauthorized,

    // Configuration errors
    ConfigurationError(String),

    // General errors
    InternalServerError(String),
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::DuplicateIdentity => write!(f, "Identity already registered"),
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::InvalidToken => write!(f, "Invalid token"),

            AppError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),

            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),

            AppError::Unauthorized => write!(f, "Unauthorized access"),

            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),

            AppError::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Message shared by every authentication failure so callers cannot tell
/// a wrong credential from a forged, stale or unknown token.
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, user_message) = match &self {
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                AUTH_FAILED_MESSAGE.to_string(),
            ),
            AppError::DuplicateIdentity => (
                StatusCode::CONFLICT,
                "Identity already registered".to_string(),
            ),

            // Never leak store details
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            },

            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            AppError::ConfigurationError(msg) | AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            },
        };

        tracing::warn!(status = %status, "API error occurred");

        let body = Json(json!({
            "error": {
                "message": user_message,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

// Unique violations are mapped by the store itself, everything else is an outage.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_render_identically() {
        let statuses: Vec<StatusCode> = [
            AppError::InvalidCredentials,
            AppError::InvalidToken,
            AppError::Unauthorized,
        ]
        .into_iter()
        .map(|e| e.into_response().status())
        .collect();

        assert!(statuses.iter().all(|s| *s == StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn store_errors_hide_details() {
        let response = AppError::store("connection refused on 10.0.0.5").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
