use axum::{
    extract::{Extension, Host, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::media_url;
use crate::audit::AuditSink;
use crate::entities::{
    attribute_key, attribute_value, category, comment, image, order,
    product::{self, Entity as ProductEntity},
    product_attribute, product_like,
};
use crate::error::ApiError;
use crate::middleware::auth::CurrentIdentity;

//ROUTERS
pub fn product_routes() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/category/:slug/", get(category_products))
        .route(
            "/product/detail/:id/",
            get(product_detail)
                .put(replace_product)
                .delete(delete_product_detail),
        )
        .route(
            "/product/:id/edit/",
            get(product_for_edit).put(patch_product).patch(patch_product),
        )
        .route("/product/:id/delete/", delete(delete_product))
}

//ROUTES
async fn list_products(
    Query(params): Query<ProductFilterQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(identity): Extension<CurrentIdentity>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host_str(&host);
    let txn = db.begin().await?;

    let mut query = ProductEntity::find().order_by_asc(product::Column::Id);

    if let Some(slug) = params.category.as_deref() {
        let category = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&txn)
            .await?;
        match category {
            Some(category) => query = query.filter(product::Column::CategoryId.eq(category.id)),
            None => return Ok((StatusCode::OK, Json(json!([]))).into_response()),
        }
    }

    // Malformed numeric/boolean filter values are ignored rather than
    // rejected; unknown query parameters never reach this point.
    if let Some(min) = params.price_min.as_deref().and_then(|v| v.parse::<f64>().ok()) {
        query = query.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = params.price_max.as_deref().and_then(|v| v.parse::<f64>().ok()) {
        query = query.filter(product::Column::Price.lte(max));
    }
    if let Some(is_liked) = params.is_liked.as_deref().and_then(|v| v.parse::<bool>().ok()) {
        query = query.filter(product::Column::IsLiked.eq(is_liked));
    }

    let products = query.all(&txn).await?;

    let mut response = Vec::with_capacity(products.len());
    for product in products {
        response.push(full_representation(&txn, host, identity.0, product).await?);
    }

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn category_products(
    Path(slug): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host_str(&host);
    let txn = db.begin().await?;

    let category = category::Entity::find()
        .filter(category::Column::Slug.eq(&slug))
        .one(&txn)
        .await?;
    let Some(category) = category else {
        return Ok((StatusCode::OK, Json(json!([]))).into_response());
    };

    let products = ProductEntity::find()
        .filter(product::Column::CategoryId.eq(category.id))
        .order_by_asc(product::Column::Id)
        .all(&txn)
        .await?;

    let mut response = Vec::with_capacity(products.len());
    for product in products {
        let primary_image = primary_image_url(&txn, host, product.id).await?;
        response.push(ProductListItem {
            id: product.id,
            name: product.name,
            price: product.price,
            primary_image,
        });
    }

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn product_detail(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(identity): Extension<CurrentIdentity>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host_str(&host);
    let txn = db.begin().await?;

    match ProductEntity::find_by_id(id).one(&txn).await? {
        Some(product) => {
            let response = full_representation(&txn, host, identity.0, product).await?;
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn replace_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(identity): Extension<CurrentIdentity>,
    host: Option<Host>,
    Json(payload): Json<ReplaceProduct>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let host = host_str(&host);
    let txn = db.begin().await?;

    let Some(existing) = ProductEntity::find_by_id(id).one(&txn).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    ensure_category_exists(&txn, payload.category).await?;

    let mut product: product::ActiveModel = existing.into();
    product.name = Set(payload.name);
    product.category_id = Set(payload.category);
    product.description = Set(payload.description);
    product.price = Set(payload.price);
    if let Some(image) = payload.image {
        product.image = Set(Some(image));
    }
    product.updated_at = Set(Utc::now());

    let updated = product.update(&txn).await?;
    let response = full_representation(&txn, host, identity.0, updated).await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn delete_product_detail(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(audit): Extension<Arc<AuditSink>>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;

    let Some(product) = ProductEntity::find_by_id(id).one(&txn).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    cascade_delete_product(&txn, &audit, product).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn product_for_edit(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
) -> Result<Response, ApiError> {
    let host = host_str(&host);
    let txn = db.begin().await?;

    match ProductEntity::find_by_id(id).one(&txn).await? {
        Some(product) => {
            let response = detail_representation(&txn, host, product).await?;
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        None => Err(ApiError::not_found("Product not found")),
    }
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    host: Option<Host>,
    Json(payload): Json<PatchProduct>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let host = host_str(&host);
    let txn = db.begin().await?;

    let Some(existing) = ProductEntity::find_by_id(id).one(&txn).await? else {
        return Err(ApiError::not_found("Product not found"));
    };

    let mut product: product::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        product.name = Set(name);
    }
    if let Some(description) = payload.description {
        product.description = Set(description);
    }
    if let Some(price) = payload.price {
        product.price = Set(price);
    }
    if let Some(category_id) = payload.category {
        ensure_category_exists(&txn, category_id).await?;
        product.category_id = Set(category_id);
    }
    if let Some(image) = payload.image {
        product.image = Set(Some(image));
    }
    product.updated_at = Set(Utc::now());

    let updated = product.update(&txn).await?;
    let response = detail_representation(&txn, host, updated).await?;
    txn.commit().await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(audit): Extension<Arc<AuditSink>>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;

    let Some(product) = ProductEntity::find_by_id(id).one(&txn).await? else {
        return Err(ApiError::not_found("Product not found"));
    };

    cascade_delete_product(&txn, &audit, product).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

//REPRESENTATIONS
#[derive(Serialize)]
struct ProductResponse {
    id: i32,
    name: String,
    category: i32,
    description: String,
    image: Option<String>,
    price: f64,
    is_liked: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
    attributes: Vec<ProductAttributeResponse>,
    comments: Vec<CommentResponse>,
    all_images: Vec<String>,
    users_like: bool,
    avg_rating: i32,
    comments_count: usize,
}

#[derive(Serialize)]
struct ProductAttributeResponse {
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
    key_id: i32,
    key_name: String,
    value_id: i32,
    value_name: String,
}

#[derive(Serialize)]
struct CommentResponse {
    id: i32,
    message: Option<String>,
    file: Option<String>,
    product: i32,
    user: Option<i32>,
    rating: i16,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
struct ProductListItem {
    id: i32,
    name: String,
    price: f64,
    primary_image: Option<String>,
}

#[derive(Serialize)]
struct ProductDetailResponse {
    id: i32,
    name: String,
    description: String,
    price: f64,
    category: i32,
    image: Option<String>,
    all_images: Vec<String>,
}

async fn full_representation<C: ConnectionTrait>(
    conn: &C,
    host: Option<&str>,
    identity: Option<i32>,
    product: product::Model,
) -> Result<ProductResponse, DbErr> {
    let images = image::Entity::find()
        .filter(image::Column::ProductId.eq(product.id))
        .order_by_asc(image::Column::Id)
        .all(conn)
        .await?;
    let comments = comment::Entity::find()
        .filter(comment::Column::ProductId.eq(product.id))
        .order_by_asc(comment::Column::Id)
        .all(conn)
        .await?;
    let attributes = product_attribute::Entity::find()
        .filter(product_attribute::Column::ProductId.eq(product.id))
        .order_by_asc(product_attribute::Column::Id)
        .all(conn)
        .await?;

    let mut attribute_reprs = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        // The schema allows dangling key/value references; such rows are
        // skipped here instead of failing the whole representation.
        let (Some(key_id), Some(value_id)) = (attribute.attr_key_id, attribute.attr_value_id)
        else {
            tracing::warn!(attribute = attribute.id, "Skipping attribute without key or value");
            continue;
        };
        let key = attribute_key::Entity::find_by_id(key_id).one(conn).await?;
        let value = attribute_value::Entity::find_by_id(value_id).one(conn).await?;
        let (Some(key), Some(value)) = (key, value) else {
            tracing::warn!(attribute = attribute.id, "Skipping attribute with dangling reference");
            continue;
        };
        attribute_reprs.push(ProductAttributeResponse {
            created_at: attribute.created_at,
            updated_at: attribute.updated_at,
            key_id: key.id,
            key_name: key.key_name,
            value_id: value.id,
            value_name: value.value_name,
        });
    }

    let users_like = match identity {
        Some(user_id) => product_like::Entity::find_by_id((product.id, user_id))
            .one(conn)
            .await?
            .is_some(),
        None => false,
    };

    let ratings: Vec<i16> = comments.iter().map(|c| c.rating).collect();
    let all_images = images
        .iter()
        .filter_map(|img| media_url(host, &img.image))
        .collect();
    let comments_count = comments.len();

    Ok(ProductResponse {
        id: product.id,
        name: product.name,
        category: product.category_id,
        description: product.description,
        image: product.image,
        price: product.price,
        is_liked: product.is_liked,
        created_at: product.created_at,
        updated_at: product.updated_at,
        attributes: attribute_reprs,
        comments: comments
            .into_iter()
            .map(|c| CommentResponse {
                id: c.id,
                message: c.message,
                file: c.file,
                product: c.product_id,
                user: c.user_id,
                rating: c.rating,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect(),
        all_images,
        users_like,
        avg_rating: average_rating(&ratings),
        comments_count,
    })
}

async fn detail_representation<C: ConnectionTrait>(
    conn: &C,
    host: Option<&str>,
    product: product::Model,
) -> Result<ProductDetailResponse, DbErr> {
    let images = image::Entity::find()
        .filter(image::Column::ProductId.eq(product.id))
        .order_by_asc(image::Column::Id)
        .all(conn)
        .await?;

    Ok(ProductDetailResponse {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price,
        category: product.category_id,
        image: product.image,
        all_images: images
            .iter()
            .filter_map(|img| media_url(host, &img.image))
            .collect(),
    })
}

/// First image flagged primary wins; at-most-one-primary is a convention,
/// not a constraint.
async fn primary_image_url<C: ConnectionTrait>(
    conn: &C,
    host: Option<&str>,
    product_id: i32,
) -> Result<Option<String>, DbErr> {
    let row = image::Entity::find()
        .filter(image::Column::ProductId.eq(product_id))
        .filter(image::Column::IsPrimary.eq(true))
        .order_by_asc(image::Column::Id)
        .one(conn)
        .await?;

    Ok(row.and_then(|img| media_url(host, &img.image)))
}

/// Mean comment rating rounded half-up; 0 when there are no comments.
fn average_rating(ratings: &[i16]) -> i32 {
    if ratings.is_empty() {
        return 0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    (sum as f64 / ratings.len() as f64).round() as i32
}

//HELPERS
pub(crate) async fn cascade_delete_product(
    txn: &DatabaseTransaction,
    audit: &AuditSink,
    product: product::Model,
) -> Result<(), ApiError> {
    let record = json!({
        "id": product.id,
        "name": product.name,
        "category": product.category_id,
        "description": product.description,
        "image": product.image,
        "price": product.price,
        "is_liked": product.is_liked,
    });
    // The audit write precedes the row removal; a sink failure is logged
    // and does not abort the delete.
    if let Err(err) = audit.record("product", product.id, &record).await {
        tracing::error!(product = product.id, error = %err, "Failed to write audit record");
    }

    image::Entity::delete_many()
        .filter(image::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    product_attribute::Entity::delete_many()
        .filter(product_attribute::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    order::Entity::delete_many()
        .filter(order::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    product_like::Entity::delete_many()
        .filter(product_like::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    ProductEntity::delete_by_id(product.id).exec(txn).await?;

    Ok(())
}

async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<(), ApiError> {
    match category::Entity::find_by_id(category_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::field(
            "category",
            format!("Category with id {category_id} does not exist"),
        )),
    }
}

fn host_str(host: &Option<Host>) -> Option<&str> {
    host.as_ref().map(|Host(h)| h.as_str())
}

//STRUCTS
#[derive(Deserialize)]
struct ProductFilterQuery {
    category: Option<String>,
    price_min: Option<String>,
    price_max: Option<String>,
    is_liked: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct ReplaceProduct {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    name: String,
    category: i32,
    description: String,
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    price: f64,
    image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct PatchProduct {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    name: Option<String>,
    description: Option<String>,
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    price: Option<f64>,
    category: Option<i32>,
    image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::average_rating;

    #[test]
    fn average_rating_defaults_to_zero() {
        assert_eq!(average_rating(&[]), 0);
    }

    #[test]
    fn average_rating_rounds_half_up() {
        assert_eq!(average_rating(&[5, 4]), 5);
        assert_eq!(average_rating(&[5, 4, 4]), 4);
        assert_eq!(average_rating(&[1, 2]), 2);
    }
}
