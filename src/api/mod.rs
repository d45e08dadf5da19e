pub mod attributes;
pub mod auth;
pub mod categories;
pub mod products;
pub mod uploads;

use axum::{middleware::from_fn_with_state, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::audit::AuditSink;
use crate::middleware::{auth::identity_middleware, logging::logging_middleware};

pub fn create_api_router(db: Arc<DatabaseConnection>, audit: Arc<AuditSink>) -> Router {
    Router::new()
        .merge(products::product_routes())
        .merge(categories::category_routes())
        .merge(attributes::attribute_routes())
        .merge(auth::auth_routes())
        .merge(uploads::upload_routes())
        .layer(from_fn_with_state(db.clone(), identity_middleware))
        .layer(Extension(db))
        .layer(Extension(audit))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Absolute URL for a stored blob, built from the request's Host header.
/// `None` when there is no request context to build an absolute URL from.
pub(crate) fn media_url(host: Option<&str>, path: &str) -> Option<String> {
    host.map(|host| format!("http://{host}/media/{path}"))
}
