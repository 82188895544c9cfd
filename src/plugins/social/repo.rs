use sqlx::PgPool;
use uuid::Uuid;

use crate::http_error::AppError;
use crate::plugins::social::models::Connection;

pub async fn user_exists(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(found)
}

/// Removes the edge if present, otherwise adds it, in one transaction.
/// Returns whether `follower` follows `followee` afterwards.
pub async fn toggle_follow(pool: &PgPool, follower: Uuid, followee: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(follower)
        .bind(followee)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?
        .rows_affected();

    if removed == 0 {
        sqlx::query("INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(follower)
            .bind(followee)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
    }

    tx.commit().await.map_err(AppError::from)?;
    Ok(removed == 0)
}

pub async fn followers(pool: &PgPool, user: Uuid) -> Result<Vec<Connection>, AppError> {
    let rows = sqlx::query_as::<_, Connection>(
        "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.follower_id WHERE f.followee_id = $1 ORDER BY f.created_at DESC",
    )
    .bind(user)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;
    Ok(rows)
}

pub async fn following(pool: &PgPool, user: Uuid) -> Result<Vec<Connection>, AppError> {
    let rows = sqlx::query_as::<_, Connection>(
        "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.followee_id WHERE f.follower_id = $1 ORDER BY f.created_at DESC",
    )
    .bind(user)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;
    Ok(rows)
}
