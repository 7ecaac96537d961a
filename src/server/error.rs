// src/server/error.rs

//! HTTP error mapping for the control surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::errors::RuncastError;

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            Self::Conflict(m) => (StatusCode::CONFLICT, "invalid_state", m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        }
    }
}

impl From<RuncastError> for ApiError {
    fn from(err: RuncastError) -> Self {
        match err {
            RuncastError::NotFound(_) => Self::NotFound(err.to_string()),
            RuncastError::InvalidState { .. } => Self::Conflict(err.to_string()),
            RuncastError::ConfigError(_) => Self::BadRequest(err.to_string()),
            other => {
                error!(error = %other, "request failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        let body = ErrorBody {
            success: false,
            error,
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
