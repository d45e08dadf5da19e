use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use std::sync::Arc;

use crate::entities::{attribute_key, attribute_value};
use crate::error::ApiError;

// Shared reference data: read-only enumerations.
pub fn attribute_routes() -> Router {
    Router::new()
        .route("/attribute-key/", get(list_attribute_keys))
        .route("/attribute-value/", get(list_attribute_values))
}

async fn list_attribute_keys(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let keys = attribute_key::Entity::find()
        .order_by_asc(attribute_key::Column::Id)
        .all(&*db)
        .await?;
    Ok((StatusCode::OK, Json(keys)).into_response())
}

async fn list_attribute_values(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let values = attribute_value::Entity::find()
        .order_by_asc(attribute_value::Column::Id)
        .all(&*db)
        .await?;
    Ok((StatusCode::OK, Json(values)).into_response())
}
