//! HTTP error mapping.
//!
//! One taxonomy for every handler: validation 400, auth 401/403, missing
//! entity 404, refused transition or concurrent-update loser 409, everything
//! else 500. Every failure body is `{"message": ...}`; internal chains go to
//! the log, never to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crust_db::StoreError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Not found".to_string()),
            StoreError::InvalidTransition(t) => ApiError::Conflict(format!(
                "Invalid status transition from {} to {}",
                t.from, t.to
            )),
            StoreError::Validation(v) => ApiError::Validation(v.to_string()),
            StoreError::DuplicateEmail => {
                ApiError::Validation("Email already in use.".to_string())
            }
            StoreError::DuplicateName => {
                ApiError::Validation("A pizza with this name already exists.".to_string())
            }
            StoreError::NotModifiable => {
                ApiError::Conflict("Order can no longer be modified".to_string())
            }
            StoreError::Conflict => {
                ApiError::Conflict("Order was modified concurrently".to_string())
            }
            err @ (StoreError::Corrupt(_) | StoreError::Database(_)) => {
                ApiError::Internal(err.into())
            }
        }
    }
}
