//! Mapping of verbach errors to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use verbach_core::VerbachError;

/// Error returned by the lookup handler
#[derive(Debug)]
pub struct ApiError(pub VerbachError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            VerbachError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<VerbachError> for ApiError {
    fn from(err: VerbachError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self.0 {
            VerbachError::InvalidInput(message) => json!({
                "error": message,
                "status": "ERROR",
            }),
            other => json!({
                "error": "Failed to process lookup",
                "details": other.to_string(),
                "status": "ERROR",
            }),
        };
        (status, Json(body)).into_response()
    }
}
