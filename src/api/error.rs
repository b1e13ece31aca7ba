use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    management::StorageError,
    spotify::SpotifyError,
    youtube::ConversionError,
};

/// Request-level failure returned to HTTP clients as `{ "error": message }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SpotifyError> for ApiError {
    fn from(e: SpotifyError) -> Self {
        let status = match &e {
            SpotifyError::InvalidUrl => StatusCode::BAD_REQUEST,
            SpotifyError::NotFound => StatusCode::NOT_FOUND,
            SpotifyError::Auth(_) => StatusCode::UNAUTHORIZED,
            SpotifyError::Forbidden => StatusCode::FORBIDDEN,
            SpotifyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SpotifyError::Upstream(_) | SpotifyError::Http(_) | SpotifyError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<ConversionError> for ApiError {
    fn from(e: ConversionError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "Playlist not found or expired")
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}
