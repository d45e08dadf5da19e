use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    api_key, auth_token, session,
    user::{self, Entity as UserEntity},
};
use crate::error::ApiError;
use crate::middleware::auth::{
    generate_token, validate_token, CurrentIdentity, TokenType, SESSION_COOKIE,
};

//ROUTERS
pub fn auth_routes() -> Router {
    Router::new()
        .route("/register/", post(register_user))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route("/token-auth/", post(token_auth))
        .route("/api/token/", post(jwt_pair))
        .route("/api/token/refresh/", post(jwt_refresh))
        .route("/api-key/", get(get_api_key))
}

//ROUTES
async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<RegisterUser>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let txn = db.begin().await?;

    let password = hash_password(&payload.password)
        .map_err(|_| ApiError::field("password", "Failed to hash password"))?;

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password: Set(password),
        email: Set(payload.email),
        ..Default::default()
    };

    let created = match new_user.insert(&txn).await {
        Ok(created) => created,
        Err(err) => {
            let _ = txn.rollback().await;
            return Err(ApiError::Db(err));
        }
    };

    // Identity-creation hook: every new user gets exactly one API key,
    // issued in the same transaction.
    let new_key = api_key::ActiveModel {
        user_id: Set(created.id),
        key: Set(api_key::generate_key()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Err(err) = new_key.insert(&txn).await {
        let _ = txn.rollback().await;
        return Err(ApiError::Db(err));
    }

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.id,
            "username": created.username,
            "email": created.email,
        })),
    )
        .into_response())
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    jar: CookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;

    let Some(model) = verify_credentials(&txn, &payload.username, &payload.password).await? else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response());
    };

    let session_id = Uuid::new_v4().to_string();
    let new_session = session::ActiveModel {
        id: Set(session_id.clone()),
        user_id: Set(model.id),
        created_at: Set(Utc::now()),
    };
    new_session.insert(&txn).await?;
    txn.commit().await?;

    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
    cookie.set_path("/");
    cookie.set_http_only(true);
    let jar = jar.add(cookie);

    Ok((
        jar,
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful",
                "username": model.username,
                "user_id": model.id,
            })),
        ),
    )
        .into_response())
}

async fn logout(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(identity): Extension<CurrentIdentity>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    // Logging out anonymously is an auth error, not a no-op.
    let user_id = identity.required()?;

    // Only the presented session ends; sessions on other devices survive.
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        session::Entity::delete_many()
            .filter(session::Column::Id.eq(cookie.value()))
            .filter(session::Column::UserId.eq(user_id))
            .exec(&*db)
            .await?;
    }
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));

    Ok((
        jar,
        (
            StatusCode::OK,
            Json(json!({ "message": "Logout successful" })),
        ),
    )
        .into_response())
}

async fn token_auth(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;

    let Some(model) = verify_credentials(&txn, &payload.username, &payload.password).await? else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response());
    };

    let existing = auth_token::Entity::find()
        .filter(auth_token::Column::UserId.eq(model.id))
        .one(&txn)
        .await?;

    let (key, created) = match existing {
        Some(token) => (token.key, false),
        None => {
            let new_token = auth_token::ActiveModel {
                user_id: Set(model.id),
                key: Set(auth_token::generate_key()),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            (new_token.insert(&txn).await?.key, true)
        }
    };
    txn.commit().await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "token": key,
            "user_id": model.id,
            "email": model.email,
            "created": created,
        })),
    )
        .into_response())
}

async fn jwt_pair(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let Some(model) = verify_credentials(&*db, &payload.username, &payload.password).await? else {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let access = generate_token(model.id, TokenType::Access)
        .map_err(|_| ApiError::Unauthorized("Failed to issue token".to_string()))?;
    let refresh = generate_token(model.id, TokenType::Refresh)
        .map_err(|_| ApiError::Unauthorized("Failed to issue token".to_string()))?;

    Ok((
        StatusCode::OK,
        Json(json!({ "access": access, "refresh": refresh })),
    )
        .into_response())
}

async fn jwt_refresh(Json(payload): Json<RefreshPayload>) -> Result<Response, ApiError> {
    let claims = validate_token(&payload.refresh, TokenType::Refresh)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let access = generate_token(claims.user_id, TokenType::Access)
        .map_err(|_| ApiError::Unauthorized("Failed to issue token".to_string()))?;

    Ok((StatusCode::OK, Json(json!({ "access": access }))).into_response())
}

async fn get_api_key(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(identity): Extension<CurrentIdentity>,
) -> Result<Response, ApiError> {
    let user_id = identity.required()?;

    match api_key::Entity::find()
        .filter(api_key::Column::UserId.eq(user_id))
        .one(&*db)
        .await?
    {
        Some(row) => Ok((StatusCode::OK, Json(json!({ "api_key": row.key }))).into_response()),
        None => Err(ApiError::not_found("API key not found for the user")),
    }
}

//HELPERS
async fn verify_credentials<C: sea_orm::ConnectionTrait>(
    conn: &C,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, ApiError> {
    let result = UserEntity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await?;

    match result {
        Some(model) if model.check_hash(password).is_ok() => Ok(Some(model)),
        _ => Ok(None),
    }
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

//STRUCTS
#[derive(Debug, Deserialize, Validate)]
struct RegisterUser {
    #[validate(length(min = 1, max = 150, message = "username must be 1-150 characters"))]
    username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    password: String,
    #[validate(email(message = "email must be a valid address"))]
    email: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
    refresh: String,
}
