use axum::{
    extract::{Extension, Host, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::media_url;
use crate::api::products::cascade_delete_product;
use crate::audit::AuditSink;
use crate::entities::{
    category::{self, slugify, Entity as CategoryEntity},
    product,
};
use crate::error::ApiError;

//ROUTERS
pub fn category_routes() -> Router {
    Router::new()
        .route("/categories/", get(list_categories))
        .route("/category/add-category/", post(create_category))
        .route("/category/:slug/delete/", delete(delete_category))
        .route(
            "/category/:slug/edit/",
            get(get_category).put(update_category).patch(update_category),
        )
}

//ROUTES
async fn list_categories(
    Query(params): Query<CategoryFilterQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host.as_ref().map(|Host(h)| h.as_str());
    let txn = db.begin().await?;

    let mut query = CategoryEntity::find().order_by_asc(category::Column::Id);
    if let Some(title) = params.title.as_deref() {
        query = query.filter(category::Column::Title.eq(title));
    }

    let categories = query.all(&txn).await?;
    let response: Vec<CategoryResponse> = categories
        .into_iter()
        .map(|categ| CategoryResponse::new(categ, host))
        .collect();

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
    Json(payload): Json<CreateCategory>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let host = host.as_ref().map(|Host(h)| h.as_str());
    let txn = db.begin().await?;

    // An explicit slug wins; derivation only ever fills an empty one.
    let slug = match payload.slug.as_deref() {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(&payload.title),
    };

    let new_category = category::ActiveModel {
        title: Set(payload.title),
        slug: Set(slug),
        image: Set(payload.image),
        ..Default::default()
    };

    let created = match new_category.insert(&txn).await {
        Ok(created) => created,
        Err(err) => {
            let _ = txn.rollback().await;
            return Err(ApiError::Db(err));
        }
    };
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::new(created, host)),
    )
        .into_response())
}

async fn get_category(
    Path(slug): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host.as_ref().map(|Host(h)| h.as_str());
    let txn = db.begin().await?;

    match find_by_slug(&txn, &slug).await? {
        Some(categ) => Ok((StatusCode::OK, Json(CategoryResponse::new(categ, host))).into_response()),
        None => Err(ApiError::not_found("Category not found")),
    }
}

async fn update_category(
    Path(slug): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
    Json(payload): Json<PatchCategory>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let host = host.as_ref().map(|Host(h)| h.as_str());
    let txn = db.begin().await?;

    let Some(existing) = find_by_slug(&txn, &slug).await? else {
        return Err(ApiError::not_found("Category not found"));
    };

    let current_title = existing.title.clone();
    let mut categ: category::ActiveModel = existing.into();

    let title = match payload.title {
        Some(title) => {
            categ.title = Set(title.clone());
            title
        }
        None => current_title,
    };
    match payload.slug.as_deref() {
        Some(slug) if !slug.is_empty() => categ.slug = Set(slug.to_string()),
        Some(_) => categ.slug = Set(slugify(&title)),
        None => {}
    }
    if let Some(image) = payload.image {
        categ.image = Set(Some(image));
    }

    let updated = categ.update(&txn).await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(CategoryResponse::new(updated, host))).into_response())
}

async fn delete_category(
    Path(slug): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(audit): Extension<Arc<AuditSink>>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;

    let Some(categ) = find_by_slug(&txn, &slug).await? else {
        return Err(ApiError::not_found("Category not found"));
    };

    let record = json!({
        "id": categ.id,
        "title": categ.title,
        "slug": categ.slug,
        "image": categ.image,
    });
    if let Err(err) = audit.record("category", categ.id, &record).await {
        tracing::error!(category = categ.id, error = %err, "Failed to write audit record");
    }

    // Owned products (and their children) go with the category; each
    // product leaves its own audit record.
    let products = product::Entity::find()
        .filter(product::Column::CategoryId.eq(categ.id))
        .all(&txn)
        .await?;
    for prod in products {
        cascade_delete_product(&txn, &audit, prod).await?;
    }

    CategoryEntity::delete_by_id(categ.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

//HELPERS
async fn find_by_slug(
    txn: &sea_orm::DatabaseTransaction,
    slug: &str,
) -> Result<Option<category::Model>, ApiError> {
    Ok(CategoryEntity::find()
        .filter(category::Column::Slug.eq(slug))
        .one(txn)
        .await?)
}

//STRUCTS
#[derive(Serialize)]
struct CategoryResponse {
    id: i32,
    title: String,
    full_image_url: Option<String>,
    slug: String,
}

impl CategoryResponse {
    fn new(value: category::Model, host: Option<&str>) -> CategoryResponse {
        let full_image_url = value
            .image
            .as_deref()
            .and_then(|image| media_url(host, image));
        CategoryResponse {
            id: value.id,
            title: value.title,
            full_image_url,
            slug: value.slug,
        }
    }
}

#[derive(Deserialize)]
struct CategoryFilterQuery {
    title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateCategory {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    title: String,
    #[validate(length(max = 255, message = "slug must be at most 255 characters"))]
    slug: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct PatchCategory {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    title: Option<String>,
    #[validate(length(max = 255, message = "slug must be at most 255 characters"))]
    slug: Option<String>,
    image: Option<String>,
}
