//! Error response implementation.

use super::types::SessionError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            error!(
                error = %self,
                source = ?std::error::Error::source(&self),
                code = self.error_code(),
                "Session error occurred"
            );
        } else {
            debug!(code = self.error_code(), "Request denied");
        }

        let status = self.status_code();

        // Internal details stay out of release builds
        let message = match &self {
            SessionError::Store(err) if cfg!(debug_assertions) => format!("{}: {}", self, err),
            SessionError::Config(err) if cfg!(debug_assertions) => format!("{}: {}", self, err),
            SessionError::Rbac(err) if cfg!(debug_assertions) => format!("{}: {}", self, err),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.error_code(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}
