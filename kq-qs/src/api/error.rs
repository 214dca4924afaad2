//! HTTP mapping of queue errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kq_common::api::ErrorResponse;
use kq_common::Error;
use tracing::error;

/// Queue error rendered as `{"error": "..."}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self(Error::InvalidInput(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(Error::NotFound(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            Error::InvalidInput(msg) | Error::NotFound(msg) => msg.clone(),
            other => {
                error!("Request failed: {}", other);
                other.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
