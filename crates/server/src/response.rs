//! Mapping of request failures to HTTP responses.
//!
//! Every error body is `{"message": ...}`; validation failures may also carry
//! `field`.

use crate::validate::Violation;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use policy::Denial;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The access gate refused the request. An expected outcome, not a fault.
    #[error("access denied: {0}")]
    Denied(Denial),

    #[error("validation failed: {}", .0.message)]
    Validation(Violation),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Identity(identity::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<identity::Error> for ApiError {
    fn from(err: identity::Error) -> Self {
        match err {
            identity::Error::InvalidCredentials => ApiError::InvalidCredentials,
            identity::Error::UsernameTaken(_) => {
                ApiError::Validation(Violation::field("username", "Username already exists"))
            }
            other => ApiError::Identity(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Denied(denial) => {
                let status =
                    StatusCode::from_u16(denial.status()).unwrap_or(StatusCode::FORBIDDEN);
                (status, Json(json!({ "message": denial.message() }))).into_response()
            }
            ApiError::Validation(violation) => {
                (StatusCode::BAD_REQUEST, Json(violation)).into_response()
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("{what} not found") })),
            )
                .into_response(),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid username or password" })),
            )
                .into_response(),
            ApiError::Storage(_) | ApiError::Identity(_) | ApiError::Task(_) => {
                error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
