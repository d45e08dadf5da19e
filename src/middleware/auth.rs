use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::entities::{api_key, auth_token, session};
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "sessionid";
pub const API_KEY_HEADER: &str = "x-api-key";

/// The acting user for this request, or anonymous. Always present in
/// request extensions once `identity_middleware` has run.
#[derive(Clone, Copy, Debug)]
pub struct CurrentIdentity(pub Option<i32>);

impl CurrentIdentity {
    /// For endpoints that demand an authenticated caller.
    pub fn required(&self) -> Result<i32, ApiError> {
        self.0
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Resolves the request to a user id via session cookie, bearer token
/// (opaque or JWT access token) or API key, in that order. Resolution never
/// rejects the request; anonymous callers pass through with no identity.
pub async fn identity_middleware(
    State(db): State<Arc<DatabaseConnection>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut identity: Option<i32> = None;

    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(Some(session)) = session::Entity::find_by_id(cookie.value().to_string())
            .one(&*db)
            .await
        {
            identity = Some(session.user_id);
        }
    }

    if identity.is_none() {
        if let Some(token) = bearer_token(&req) {
            identity = resolve_bearer(&db, &token).await;
        }
    }

    if identity.is_none() {
        let header = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok());
        if let Some(key) = header {
            if let Ok(Some(row)) = api_key::Entity::find()
                .filter(api_key::Column::Key.eq(key))
                .one(&*db)
                .await
            {
                identity = Some(row.user_id);
            }
        }
    }

    req.extensions_mut().insert(CurrentIdentity(identity));
    next.run(req).await
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .map(|token| token.to_string())
}

async fn resolve_bearer(db: &DatabaseConnection, token: &str) -> Option<i32> {
    match auth_token::Entity::find()
        .filter(auth_token::Column::Key.eq(token))
        .one(db)
        .await
    {
        Ok(Some(row)) => return Some(row.user_id),
        Ok(None) => {}
        Err(err) => {
            tracing::error!(error = %err, "Token lookup failed");
            return None;
        }
    }

    match validate_token(token, TokenType::Access) {
        Ok(claims) => Some(claims.user_id),
        Err(_) => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub token_type: String,
    pub exp: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    fn lifetime(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(1),
            TokenType::Refresh => Duration::hours(24),
        }
    }
}

pub fn generate_token(user_id: i32, token_type: TokenType) -> Result<String, AuthTokenError> {
    let exp = Utc::now()
        .checked_add_signed(token_type.lifetime())
        .ok_or(AuthTokenError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        token_type: token_type.as_str().to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_secret_key()?.as_bytes()),
    )
    .map_err(|_| AuthTokenError::GenerationFail)
}

pub fn validate_token(token: &str, expected: TokenType) -> Result<Claims, AuthTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_secret_key()?.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthTokenError::ValidationFail)?;

    let claims = token_data.claims;
    if claims.token_type != expected.as_str() {
        return Err(AuthTokenError::WrongTokenType);
    }

    Ok(claims)
}

#[derive(Error, Debug)]
pub enum AuthTokenError {
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Unexpected token type")]
    WrongTokenType,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("SECRET is not configured")]
    MissingSecret,
}

/// Presence is asserted once at startup; a missing value here becomes a
/// token error, never a panic.
fn get_secret_key() -> Result<String, AuthTokenError> {
    dotenvy::dotenv().ok();
    std::env::var("SECRET").map_err(|_| AuthTokenError::MissingSecret)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env mutations cannot race each other.
    #[test]
    fn token_helpers_surface_missing_secret_instead_of_panicking() {
        std::env::remove_var("SECRET");
        assert!(matches!(
            generate_token(1, TokenType::Access),
            Err(AuthTokenError::MissingSecret)
        ));
        assert!(matches!(
            validate_token("whatever", TokenType::Access),
            Err(AuthTokenError::MissingSecret)
        ));

        std::env::set_var("SECRET", "unit-test-secret");
        let token = generate_token(7, TokenType::Access).expect("Failed to generate token");
        let claims = validate_token(&token, TokenType::Access).expect("Failed to validate token");
        assert_eq!(claims.user_id, 7);
        assert!(matches!(
            validate_token(&token, TokenType::Refresh),
            Err(AuthTokenError::WrongTokenType)
        ));
    }
}
