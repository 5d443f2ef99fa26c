//! HTTP mapping of crate errors.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::error::Error;

use super::render;

/// Error returned by handlers; renders an HTML error page.
#[derive(Debug)]
pub struct WebError(pub Error);

/// Result type alias for handlers.
pub type WebResult<T> = std::result::Result<T, WebError>;

impl From<Error> for WebError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl WebError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::PatientNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::DuplicatePatient { .. } => StatusCode::CONFLICT,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::AnalysisSpawn { .. }
            | Error::AnalysisFailed { .. }
            | Error::ResultMissing { .. }
            | Error::ResultMalformed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        (status, Html(render::error_page(status, &self.0.to_string()))).into_response()
    }
}
