//! Mapping of redirect failures onto HTTP responses.

use archportal::MirrorError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the site handlers.
#[derive(Error, Debug)]
pub enum SiteError {
    /// Redirect resolution failed.
    #[error(transparent)]
    Mirror(#[from] MirrorError),
}

impl SiteError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiteError::Mirror(MirrorError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
            SiteError::Mirror(MirrorError::NotFound(_))
            | SiteError::Mirror(MirrorError::NoMirrorAvailable) => StatusCode::NOT_FOUND,
            SiteError::Mirror(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Failed to handle request: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
            message,
        )
            .into_response()
    }
}
