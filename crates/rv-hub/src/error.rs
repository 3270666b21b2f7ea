//! Service-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use rv_search::SearchError;

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    /// The request cannot be scoped to a command index (no sandbox ID on
    /// the run and no access token + user ID fallback).
    #[error("{0}")]
    MissingScope(String),

    #[error(transparent)]
    Data(#[from] SearchError),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) | ServiceError::MissingScope(_) => StatusCode::BAD_REQUEST,
            ServiceError::Data(SearchError::Unreachable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Data(SearchError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Data(SearchError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        (
            status,
            Json(ApiError {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::BadRequest("bad phaseIds".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingScope("no sandbox".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Data(SearchError::NotFound("no event".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Data(SearchError::InvalidQuery("empty".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Data(SearchError::Malformed("odd shape".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
