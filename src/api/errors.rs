use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::{readings::QueryError, validation::ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::NotFound(location_id) => {
                Self::NotFound(format!("no co2 data found for location {location_id}"))
            }
            QueryError::Storage(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("could not parse request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => {
                debug!(fields = errors.len(), "Request failed validation");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "error": errors }),
                )
            }
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
            other => {
                let status = match other {
                    AppError::NotFound(_) => StatusCode::NOT_FOUND,
                    AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    AppError::Conflict(_) => StatusCode::CONFLICT,
                    _ => StatusCode::UNAUTHORIZED,
                };
                (status, json!({ "error": other.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}
