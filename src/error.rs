use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::types::ErrorResponse;

/// Request-level failures. Each one aborts the request before anything is
/// sent to the provider.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Twilio credentials not configured on server.")]
    Configuration,

    #[error("Invalid request body. Expected {{ messages: [{{ to, body }}] }}")]
    MalformedRequest,

    #[error("Maximum {max} messages per request.")]
    TooManyItems { max: usize },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedRequest | Self::TooManyItems { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
