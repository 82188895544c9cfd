use axum::http::StatusCode;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::http_error::AppError;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Token id, the handle used to revoke it.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// What a valid token says about its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub expires_at: i64,
}

fn secret() -> Result<String, AppError> {
    env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("jwtSecretNotConfigured").with_code("config_error"))
}

pub fn issue(user_id: Uuid) -> Result<String, AppError> {
    let secret = secret()?;
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(e.to_string()))
}

fn invalid(message: &str) -> AppError {
    AppError::new(StatusCode::UNAUTHORIZED, message).with_code("invalid_token")
}

/// Validates signature and expiry. Revocation is checked separately.
pub fn verify(token: &str) -> Result<Verified, AppError> {
    let secret = secret()?;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map_err(|_| invalid("invalid token"))?;
    Ok(Verified {
        user_id: Uuid::parse_str(&data.claims.sub).map_err(|_| invalid("invalid token subject"))?,
        token_id: Uuid::parse_str(&data.claims.jti).map_err(|_| invalid("invalid token id"))?,
        expires_at: data.claims.exp as i64,
    })
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
pub fn bearer(header: Option<&str>) -> Result<&str, AppError> {
    let header = header
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "missing authorization").with_code("missing_token"))?;
    header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "invalid authorization header").with_code("invalid_token"))
}
