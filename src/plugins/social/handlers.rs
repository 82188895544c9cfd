use axum::http::StatusCode;
use axum::{Extension, Json};
use sqlx::PgPool;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::AuthUser;
use crate::plugins::social::models::{Connection, FollowRequest, FollowToggled};
use crate::plugins::social::repo;

pub async fn toggle_follow(
    Extension(pool): Extension<PgPool>,
    auth: AuthUser,
    Json(req): Json<FollowRequest>,
) -> Result<(StatusCode, Json<FollowToggled>), AppError> {
    let target = req
        .user_id
        .ok_or_else(|| AppError::bad_request("Please enter valid user id"))?;
    if target == auth.user_id {
        return Err(AppError::bad_request("You cannot follow yourself").with_code("self_follow"));
    }
    if !repo::user_exists(&pool, target).await? {
        return Err(AppError::new(StatusCode::NOT_FOUND, "notFound").with_code("not_found"));
    }

    let followed = repo::toggle_follow(&pool, auth.user_id, target).await?;
    tracing::debug!(follower = %auth.user_id, followee = %target, followed, "follow toggled");
    let status = if followed { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(FollowToggled { followed })))
}

pub async fn followers(Extension(pool): Extension<PgPool>, auth: AuthUser) -> Result<Json<Vec<Connection>>, AppError> {
    Ok(Json(repo::followers(&pool, auth.user_id).await?))
}

pub async fn following(Extension(pool): Extension<PgPool>, auth: AuthUser) -> Result<Json<Vec<Connection>>, AppError> {
    Ok(Json(repo::following(&pool, auth.user_id).await?))
}
