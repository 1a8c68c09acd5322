use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use custdb::gateway::GatewayError;

pub type ApiResult<T> = Result<T, ApiError>;

pub const MISSING_BODY: &str = "Missing request body";
pub const UNAUTHORIZED: &str = "Unauthorized: Invalid or missing API key";

/// Failures as the client sees them.
///
/// Query validation on the find route reports under a `message` key, every
/// other failure under `error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    InvalidQuery(&'static str),
    #[error("no matching customer documents found")]
    NoMatch,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
    #[error("{}", UNAUTHORIZED)]
    Unauthorized,
}

impl ApiError {
    pub fn bad_request(error: GatewayError) -> Self {
        Self::BadRequest(error.to_string())
    }

    pub fn not_found(error: GatewayError) -> Self {
        Self::NotFound(error.to_string())
    }

    pub fn internal(error: GatewayError) -> Self {
        Self::Internal(error.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoMatch | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::InvalidQuery(_) | ApiError::NoMatch => json!({ "message": self.to_string() }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidQuery("query string is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NoMatch.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::bad_request(GatewayError::Storage("boom".to_owned())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal(GatewayError::Closed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_gateway_message_passes_through() {
        assert_eq!(
            ApiError::not_found(GatewayError::NotFound("invalid customer number")),
            ApiError::NotFound("invalid customer number".to_owned())
        );
        assert_eq!(
            ApiError::Unauthorized.to_string(),
            "Unauthorized: Invalid or missing API key"
        );
    }
}
