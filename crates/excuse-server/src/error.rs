//! HTTP error responses
//!
//! Every handler error ends up here. Validation problems carry their message
//! to the client; backend failures are logged and reported opaquely.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use excuse_core::ExcuseError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<ExcuseError> for ApiError {
    fn from(e: ExcuseError) -> Self {
        match e {
            ExcuseError::InvalidInput(message) => ApiError::BadRequest(message),
            ExcuseError::NotFound(_) => ApiError::NotFound("Excuse not found".to_string()),
            ExcuseError::DuplicateId(id) => {
                ApiError::Conflict(format!("Excuse {} already exists", id))
            }
            e => {
                tracing::error!("Storage failure: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid JSON".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        ApiError::BadRequest("Invalid query parameters".to_string())
    }
}
