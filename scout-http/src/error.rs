use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::session::SessionError;

/// Error response structure for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String, code: Option<String>) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                code,
            },
        }
    }

    pub fn invalid_request(message: String) -> Self {
        Self::new(message, "invalid_request".to_string(), None)
    }

    pub fn unavailable(message: String, code: &str) -> Self {
        Self::new(message, "unavailable".to_string(), Some(code.to_string()))
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(message, "internal_error".to_string(), None)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.r#type.as_str() {
            "invalid_request" => StatusCode::BAD_REQUEST,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<SessionError> for ErrorResponse {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::CapacityReached(max) => ErrorResponse::unavailable(
                format!("Maximum number of threads reached: {}", max),
                "thread_limit_reached",
            ),
            SessionError::Store(e) => {
                error!("Session store error: {}", e);
                ErrorResponse::internal_error("Failed to open thread".to_string())
            }
        }
    }
}

/// Custom JSON extractor that returns our ErrorResponse on deserialization failures
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ErrorResponse))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        error!("JSON deserialization error: {}", message);
        ErrorResponse::invalid_request(message)
    }
}
