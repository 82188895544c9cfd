use sqlx::PgPool;
use sqlx::Row;
use axum::http::StatusCode;
use crate::http_error::AppError;
use crate::plugins::users::models::{ProfileDto, UpdateProfile, UserDto, UserSummary};
use uuid::Uuid;
use bcrypt::{hash, DEFAULT_COST};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: Option<&'a str>,
}

pub async fn insert_user(pool: &PgPool, new: NewUser<'_>) -> Result<UserDto, AppError> {
    let password_hash = hash_password(new.password)?;
    let sql = format!(
        "INSERT INTO users (username, email, password_hash, first_name, last_name, phone_number) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, UserDto>(&sql)
        .bind(new.username)
        .bind(new.email)
        .bind(&password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.phone_number)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(user)
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<UserDto, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let user = sqlx::query_as::<_, UserDto>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(user)
}

/// Contact details used to deliver one-time codes.
pub struct Contact {
    pub id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
}

pub async fn find_contact(pool: &PgPool, username: &str) -> Result<Contact, AppError> {
    let row = sqlx::query("SELECT id, email, phone_number FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(Contact { id: row.get("id"), email: row.get("email"), phone_number: row.get("phone_number") })
}

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<ProfileDto, AppError> {
    let profile = sqlx::query_as::<_, ProfileDto>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.bio, u.phone_number, u.image, u.date_of_birth, u.created_at, \
         (SELECT COUNT(*) FROM follows f WHERE f.followee_id = u.id) AS follower_count, \
         (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count, \
         (SELECT COUNT(*) FROM stories s WHERE s.owner_id = u.id) AS story_count \
         FROM users u WHERE u.id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)?;
    Ok(profile)
}

pub async fn update_profile(pool: &PgPool, id: Uuid, update: UpdateProfile) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET first_name = COALESCE($1, first_name), last_name = COALESCE($2, last_name), \
         bio = COALESCE($3, bio), phone_number = COALESCE($4, phone_number), \
         date_of_birth = COALESCE($5, date_of_birth) WHERE id = $6",
    )
    .bind(update.first_name)
    .bind(update.last_name)
    .bind(update.bio)
    .bind(update.phone_number)
    .bind(update.date_of_birth)
    .bind(id)
    .execute(pool)
    .await
    .map_err(AppError::from)?;
    Ok(())
}

/// Points the profile picture at `image` and returns the one it replaced.
pub async fn set_image(pool: &PgPool, id: Uuid, image: &str) -> Result<Option<String>, AppError> {
    let previous: Option<String> = sqlx::query_scalar(
        "UPDATE users u SET image = $1 FROM users prev WHERE u.id = $2 AND prev.id = u.id RETURNING prev.image",
    )
    .bind(image)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)?;
    Ok(previous)
}

pub async fn password_hash(pool: &PgPool, id: Uuid) -> Result<String, AppError> {
    let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(hash)
}

pub async fn set_password(pool: &PgPool, id: Uuid, password: &str) -> Result<(), AppError> {
    let password_hash = hash_password(password)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::from)?;
    Ok(())
}

pub async fn activate(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::from)?;
    Ok(())
}

pub async fn search_users(pool: &PgPool, term: &str) -> Result<Vec<UserSummary>, AppError> {
    let pattern = format!("%{}%", term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, first_name, last_name, image FROM users \
         WHERE username ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 \
         ORDER BY username LIMIT 50",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;
    Ok(users)
}

pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let done = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await.map_err(AppError::from)?;
    if done.rows_affected() == 0 {
        return Err(AppError::from(sqlx::Error::RowNotFound));
    }
    Ok(())
}
