use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use quill_types::api::MessageResponse;

/// Message returned for both an unknown username and a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// A unique field is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Login failed. Deliberately does not say which field was wrong.
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    /// Missing, malformed, or expired bearer token.
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(String),

    /// Request body exceeded the configured limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Store or hashing failure. The cause is logged, never sent to the client.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Treat a missing or empty field as absent.
pub(crate) fn require(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!("Request failed: {:#}", cause);
        }

        (self.status_code(), Json(MessageResponse::new(self.client_message()))).into_response()
    }
}
