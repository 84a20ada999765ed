use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<till_core::Error> for AppError {
    fn from(error: till_core::Error) -> Self {
        match error {
            till_core::Error::InvalidInput(message) => Self::BadRequest(message),
            till_core::Error::NotFound(message) => Self::NotFound(message),
            other => {
                tracing::error!("Storage failure: {other}");
                Self::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_hide_details() {
        let error = AppError::from(till_core::Error::Database("disk I/O error".to_string()));
        assert_eq!(error.to_string(), "Internal server error");
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_input_maps_to_bad_request() {
        let error = AppError::from(till_core::Error::InvalidInput("missing id".to_string()));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
