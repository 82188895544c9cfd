use sqlx::PgPool;
use crate::http_error::AppError;
use uuid::Uuid;
use sqlx::Row;

pub struct Credentials {
    pub id: Uuid,
    pub password_hash: String,
    pub is_active: bool,
}

pub async fn find_credentials(pool: &PgPool, username_or_email: &str) -> Result<Option<Credentials>, AppError> {
    let opt = sqlx::query("SELECT id, password_hash, is_active FROM users WHERE username = $1 OR email = $1 LIMIT 1")
        .bind(username_or_email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?;

    Ok(opt.map(|r| Credentials {
        id: r.get("id"),
        password_hash: r.get("password_hash"),
        is_active: r.get("is_active"),
    }))
}

pub async fn is_active(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let active: bool = sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(active)
}
