use axum::{Extension, Json, extract::State};
use axum::http::{Extensions, HeaderMap, StatusCode};
use axum::http::header::AUTHORIZATION;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use async_trait::async_trait;
use bcrypt::verify;
use sqlx::PgPool;

use crate::http_error::AppError;
use crate::plugins::auth::models::{LoginRequest, LoginResponse};
use crate::plugins::auth::repo;
use crate::plugins::auth::session::Revocations;
use crate::plugins::auth::token;
use crate::plugins::users::models::{Message, UserDto};
use crate::plugins::users::repo as users_repo;

/// The authenticated principal. Taken from request extensions when
/// `require_auth` already ran, otherwise decoded from the bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub token_id: uuid::Uuid,
    /// Expiry of the presented token, unix seconds.
    pub expires_at: i64,
}

/// Checks the bearer token of a request, including whether it was revoked.
/// The [`Revocations`] store is installed app-wide by the kernel.
pub async fn authenticate(headers: &HeaderMap, extensions: &Extensions) -> Result<AuthUser, AppError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let verified = token::verify(token::bearer(header)?)?;
    let revocations = extensions
        .get::<Revocations>()
        .cloned()
        .ok_or_else(|| AppError::internal("session store not configured").with_code("config_error"))?;
    let revoked = revocations
        .is_revoked(verified.token_id)
        .await
        .map_err(|e| AppError::internal(format!("session lookup failed: {e}")))?;
    if revoked {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "token revoked").with_code("token_revoked"));
    }
    Ok(AuthUser { user_id: verified.user_id, token_id: verified.token_id, expires_at: verified.expires_at })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthUser>() {
            return Ok(*auth);
        }
        authenticate(&parts.headers, &parts.extensions).await
    }
}

pub async fn login(State(pool): State<PgPool>, Json(payload): Json<LoginRequest>) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "usernameAndPasswordRequired").with_code("invalid_credentials"));
    }

    let Some(creds) = repo::find_credentials(&pool, &payload.username).await? else {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "invalidUsernameOrPassword").with_code("invalid_credentials"));
    };

    let valid = verify(&payload.password, &creds.password_hash).map_err(|e| AppError::internal(e.to_string()))?;
    if !valid {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "invalidUsernameOrPassword").with_code("invalid_credentials"));
    }
    if !creds.is_active {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "accountInactive").with_code("account_inactive"));
    }

    let token = token::issue(creds.id)?;
    tracing::info!(user_id = %creds.id, "user logged in");
    Ok(Json(LoginResponse { token, user_id: creds.id }))
}

pub async fn whoami(State(pool): State<PgPool>, auth: AuthUser) -> Result<Json<UserDto>, AppError> {
    let user = users_repo::get_user(&pool, auth.user_id).await?;
    Ok(Json(user))
}

async fn revoke(revocations: &Revocations, auth: &AuthUser) -> Result<(), AppError> {
    revocations
        .revoke(auth.token_id, auth.expires_at)
        .await
        .map_err(|e| AppError::internal(format!("could not revoke token: {e}")))
}

/// Exchanges a still-valid token for a fresh one, provided the account is
/// still active. The presented token stops working.
pub async fn refresh(
    State(pool): State<PgPool>,
    Extension(revocations): Extension<Revocations>,
    auth: AuthUser,
) -> Result<Json<LoginResponse>, AppError> {
    if !repo::is_active(&pool, auth.user_id).await? {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "accountInactive").with_code("account_inactive"));
    }
    let token = token::issue(auth.user_id)?;
    revoke(&revocations, &auth).await?;
    Ok(Json(LoginResponse { token, user_id: auth.user_id }))
}

pub async fn logout(Extension(revocations): Extension<Revocations>, auth: AuthUser) -> Result<Json<Message>, AppError> {
    revoke(&revocations, &auth).await?;
    tracing::info!(user_id = %auth.user_id, "user logged out");
    Ok(Json(Message::new("User logged out successfully")))
}
