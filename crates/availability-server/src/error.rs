//! Mapping of engine errors onto HTTP responses.

use availability_engine::RuleError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: bool,
    kind: &'static str,
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: true,
            kind: self.kind,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<RuleError> for HttpError {
    fn from(err: RuleError) -> Self {
        let status = match &err {
            RuleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RuleError::NotFound { .. } => StatusCode::NOT_FOUND,
            RuleError::Conflict(_) => StatusCode::CONFLICT,
            RuleError::Snapshot(_) => {
                error!(error = %err, "snapshot error while serving a request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
