use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

/// Request-level failure taxonomy. Everything a handler can bubble up turns
/// into a structured JSON body; internals never leak to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),
    #[error("{1}")]
    Field(&'static str, String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    /// Single-field validation failure, e.g. a dangling foreign key.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Field(field, message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                let mut map = serde_json::Map::new();
                for (field, violations) in errors.field_errors() {
                    let messages: Vec<String> = violations
                        .iter()
                        .map(|v| match &v.message {
                            Some(message) => message.to_string(),
                            None => v.code.to_string(),
                        })
                        .collect();
                    map.insert(field.to_string(), json!(messages));
                }
                (StatusCode::BAD_REQUEST, Json(serde_json::Value::Object(map)))
                    .into_response()
            }
            ApiError::Field(field, message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ field: [message] })),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Db(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Resource already exists" })),
                )
                    .into_response(),
                _ => {
                    tracing::error!(error = %err, "Database error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Internal server error" })),
                    )
                        .into_response()
                }
            },
        }
    }
}
