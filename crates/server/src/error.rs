//! Server error types and the HTTP error body.

use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use registry_auth_authn::{AuthError, ErrorClass};
use serde_json::json;
use thiserror::Error;

/// Startup failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The configuration could not be loaded or deserialized.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The seed file could not be read or parsed.
    #[error("Failed to load seed data from {}: {message}", path.display())]
    Seed {
        /// Seed file path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Key material or token settings are unusable.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a `Seed` error.
    #[must_use]
    pub fn seed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Seed { path: path.into(), message: message.into() }
    }
}

/// An [`AuthError`] rendered as an HTTP response.
///
/// Refusals become `403` with `{code, message, context}`. Internal faults
/// become `500` with a generic message; the details stay in the logs.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        match err.class() {
            ErrorClass::Forbidden => {
                let body = json!({
                    "code": err.code(),
                    "message": err.to_string(),
                    "context": err.context(),
                });
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            },
            ErrorClass::Internal => {
                let body = json!({
                    "code": err.code(),
                    "message": "internal error",
                    "context": {},
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            },
        }
    }
}
