use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use plaza_types::api::ErrorBody;

/// Everything a chat request can fail with, mapped onto one HTTP status and
/// one structured JSON body each. Internal detail stays in the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid initData")]
    Unauthorized,
    #[error("Unauthorized")]
    ServiceUnauthorized,
    #[error("You need an active status to start a chat")]
    NoActiveStatus,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Access denied to this room")]
    AccessDenied,
    #[error("Message text must not be empty")]
    EmptyMessage,
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::EmptyMessage => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::ServiceUnauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NoActiveStatus | ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::RoomNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::NoActiveStatus => Some("NO_ACTIVE_STATUS"),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("internal error: {:#}", e);
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().map(str::to_string),
        };
        (self.status(), Json(body)).into_response()
    }
}
