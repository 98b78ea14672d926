//! Error taxonomy shared by the service crates.
//!
//! Every handler returns `AppResult<T>`; the `IntoResponse` impl turns an
//! `AppError` into a status code and a `{"detail": ...}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::response::ErrorDetail;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Account credentials are missing or empty.
    #[error("{0}")]
    Configuration(String),

    /// The remote service rejected the credentials or a token refresh failed.
    /// `status` is `None` when the token endpoint never answered.
    #[error(
        "authentication failed{}: {body}",
        .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
    )]
    Authentication { status: Option<u16>, body: String },

    /// Transport failure, timeout or non-success response from the remote service.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// Credentials were refused while the client was being set up.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Builds a `RemoteService` error from a non-success status and body.
    pub fn remote_status(url: &str, status: u16, body: &str) -> Self {
        AppError::RemoteService(format!("GET {} returned HTTP {}: {}", url, status, body))
    }

    /// True when the token endpoint refused the credentials themselves
    /// (400/401/403), as opposed to an outage or a malformed answer.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            AppError::Authentication {
                status: Some(400 | 401 | 403),
                ..
            }
        )
    }

    /// HTTP status this error maps to at the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Authentication { .. }
            | AppError::RemoteService(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Prefixes the message. 401 variants stay 401; everything else becomes `Internal`.
    pub fn context(self, prefix: &str) -> Self {
        match self {
            AppError::Configuration(msg) => AppError::Configuration(format!("{}: {}", prefix, msg)),
            AppError::Unauthorized(msg) => AppError::Unauthorized(format!("{}: {}", prefix, msg)),
            other => AppError::Internal(format!("{}: {}", prefix, other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(ErrorDetail::new(self.to_string()))).into_response()
    }
}
