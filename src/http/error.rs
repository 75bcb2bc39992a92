use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::ServiceError;
use crate::infra::store::StoreError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Maps a service failure to a response; store causes are logged, not exposed.
    pub fn from_service(err: ServiceError, action: &str) -> Self {
        match err {
            ServiceError::Unauthenticated => Self::unauthorized("user not authenticated"),
            ServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            ServiceError::Invalid(message) => Self::bad_request(message),
            ServiceError::Conflict(message) => Self::conflict(message),
            ServiceError::AggregationFailure(StoreError::InvalidToken) => {
                Self::bad_request("invalid nextToken")
            }
            ServiceError::AggregationFailure(cause) => {
                tracing::error!(error = ?cause, "failed to {}", action);
                Self::internal(format!("failed to {}", action))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
