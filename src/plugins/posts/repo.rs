use std::collections::HashMap;

use axum::http::StatusCode;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::http_error::AppError;
use crate::plugins::posts::models::{CommentDto, ExploreItem, MediaItem, MediaKind, PostDto, PostMediaRow, PostRow};

/// `$1` is always the viewer; `has_liked` and `has_saved` are relative to it.
const POST_SELECT: &str = "SELECT p.id, p.owner_id, u.username, u.image AS profile_pic, p.description, p.created_at, \
    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count, \
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
    EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = $1) AS has_liked, \
    EXISTS (SELECT 1 FROM post_saves s WHERE s.post_id = p.id AND s.user_id = $1) AS has_saved \
    FROM posts p JOIN users u ON u.id = p.owner_id";

const COMMENT_FIELDS: &str =
    "c.id, c.post_id, c.body AS comment, c.created_at, u.id AS user_id, u.username, u.image AS profile_pic";

pub const MAX_PAGE: i64 = 100;
pub const DEFAULT_PAGE: i64 = 30;

pub fn not_found() -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "notFound").with_code("not_found")
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    Everyone,
    Owner(Uuid),
    /// Posts by accounts the viewer follows.
    Followees,
    LikedBy(Uuid),
    SavedBy(Uuid),
}

impl PostFilter {
    /// The WHERE clause and its `$2` argument, if any.
    pub fn clause(self) -> (&'static str, Option<Uuid>) {
        match self {
            PostFilter::Everyone => ("", None),
            PostFilter::Owner(user) => ("WHERE p.owner_id = $2", Some(user)),
            PostFilter::Followees => (
                "WHERE p.owner_id IN (SELECT followee_id FROM follows WHERE follower_id = $1)",
                None,
            ),
            PostFilter::LikedBy(user) => (
                "WHERE EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = $2)",
                Some(user),
            ),
            PostFilter::SavedBy(user) => (
                "WHERE EXISTS (SELECT 1 FROM post_saves s WHERE s.post_id = p.id AND s.user_id = $2)",
                Some(user),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

pub fn list_sql(filter: PostFilter) -> (String, Option<Uuid>) {
    let (clause, subject) = filter.clause();
    let next = if subject.is_some() { 3 } else { 2 };
    let sql = format!(
        "{POST_SELECT} {clause} ORDER BY p.created_at DESC, p.id DESC LIMIT ${next} OFFSET ${}",
        next + 1
    );
    (sql, subject)
}

/// Pairs each row with its media, keeping row order.
pub fn attach(rows: Vec<PostRow>, media: Vec<PostMediaRow>) -> Vec<PostDto> {
    let mut by_post: HashMap<Uuid, Vec<PostMediaRow>> = HashMap::new();
    for m in media {
        by_post.entry(m.post_id).or_default().push(m);
    }
    rows.into_iter()
        .map(|row| {
            let media = by_post.remove(&row.id).unwrap_or_default();
            PostDto::assemble(row, media)
        })
        .collect()
}

async fn media_for(pool: &PgPool, post_ids: &[Uuid]) -> Result<Vec<PostMediaRow>, AppError> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, PostMediaRow>(
        "SELECT id, post_id, kind, media FROM post_media WHERE post_id = ANY($1) ORDER BY post_id, position",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;
    Ok(rows)
}

pub async fn insert_post(pool: &PgPool, owner: Uuid, description: &str, media: &[(MediaKind, String)]) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let id: Uuid = sqlx::query_scalar("INSERT INTO posts (owner_id, description) VALUES ($1, $2) RETURNING id")
        .bind(owner)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

    for (position, (kind, reference)) in media.iter().enumerate() {
        sqlx::query("INSERT INTO post_media (post_id, kind, media, position) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(kind.as_str())
            .bind(reference)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
    }

    tx.commit().await.map_err(AppError::from)?;
    Ok(id)
}

pub async fn fetch_post(pool: &PgPool, viewer: Uuid, id: Uuid) -> Result<PostDto, AppError> {
    let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $2"))
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?
        .ok_or_else(not_found)?;
    let media = media_for(pool, &[row.id]).await?;
    Ok(PostDto::assemble(row, media))
}

pub async fn list_posts(pool: &PgPool, viewer: Uuid, filter: PostFilter, page: Page) -> Result<Vec<PostDto>, AppError> {
    let (sql, subject) = list_sql(filter);
    let mut query = sqlx::query_as::<_, PostRow>(&sql).bind(viewer);
    if let Some(subject) = subject {
        query = query.bind(subject);
    }
    let rows = query
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .map_err(AppError::from)?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let media = media_for(pool, &ids).await?;
    Ok(attach(rows, media))
}

/// A random sample of posts from accounts the viewer neither is nor follows.
pub async fn explore(pool: &PgPool, viewer: Uuid, limit: i64) -> Result<Vec<ExploreItem>, AppError> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT p.id FROM posts p \
         WHERE p.owner_id <> $1 \
           AND p.owner_id NOT IN (SELECT followee_id FROM follows WHERE follower_id = $1) \
         ORDER BY random() LIMIT $2",
    )
    .bind(viewer)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;

    let mut images: HashMap<Uuid, Vec<MediaItem>> = HashMap::new();
    for m in media_for(pool, &ids).await? {
        if m.kind == MediaKind::Image.as_str() {
            images.entry(m.post_id).or_default().push(MediaItem { id: m.id, url: m.media });
        }
    }
    Ok(ids
        .into_iter()
        .map(|id| ExploreItem { id, images: images.remove(&id).unwrap_or_default() })
        .collect())
}

/// Locks the post row and checks that `user` owns it.
async fn lock_owned(tx: &mut Transaction<'_, Postgres>, user: Uuid, id: Uuid) -> Result<(), AppError> {
    let owner: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::from)?;
    match owner {
        None => Err(not_found()),
        Some(owner) if owner != user => {
            Err(AppError::new(StatusCode::FORBIDDEN, "not the owner of this post").with_code("forbidden"))
        }
        Some(_) => Ok(()),
    }
}

pub async fn update_description(pool: &PgPool, user: Uuid, id: Uuid, description: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;
    lock_owned(&mut tx, user, id).await?;
    sqlx::query("UPDATE posts SET description = $1 WHERE id = $2")
        .bind(description)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(())
}

/// Deletes an owned post and returns the media references it held.
pub async fn delete_post(pool: &PgPool, user: Uuid, id: Uuid) -> Result<Vec<String>, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::from)?;
    lock_owned(&mut tx, user, id).await?;
    let media: Vec<String> = sqlx::query_scalar("SELECT media FROM post_media WHERE post_id = $1")
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
    tx.commit().await.map_err(AppError::from)?;
    Ok(media)
}

pub async fn post_exists(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(found)
}

/// Per-user marks on a post.
#[derive(Debug, Clone, Copy)]
pub enum Mark {
    Like,
    Save,
}

impl Mark {
    fn table(self) -> &'static str {
        match self {
            Mark::Like => "post_likes",
            Mark::Save => "post_saves",
        }
    }
}

/// Removes the mark if present, otherwise adds it. Returns whether it is set afterwards.
pub async fn toggle_mark(pool: &PgPool, mark: Mark, user: Uuid, post: Uuid) -> Result<bool, AppError> {
    let table = mark.table();
    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let removed = sqlx::query(&format!("DELETE FROM {table} WHERE post_id = $1 AND user_id = $2"))
        .bind(post)
        .bind(user)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?
        .rows_affected();

    if removed == 0 {
        sqlx::query(&format!("INSERT INTO {table} (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"))
            .bind(post)
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
    }

    tx.commit().await.map_err(AppError::from)?;
    Ok(removed == 0)
}

pub async fn likes_count(pool: &PgPool, post: Uuid) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
        .bind(post)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(count)
}

pub async fn add_comment(pool: &PgPool, user: Uuid, post: Uuid, body: &str) -> Result<CommentDto, AppError> {
    let comment = sqlx::query_as::<_, CommentDto>(&format!(
        "WITH c AS (INSERT INTO comments (post_id, user_id, body) VALUES ($1, $2, $3) RETURNING *) \
         SELECT {COMMENT_FIELDS} FROM c JOIN users u ON u.id = c.user_id"
    ))
    .bind(post)
    .bind(user)
    .bind(body)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)?;
    Ok(comment)
}

/// Oldest first.
pub async fn comments(pool: &PgPool, post: Uuid) -> Result<Vec<CommentDto>, AppError> {
    let rows = sqlx::query_as::<_, CommentDto>(&format!(
        "SELECT {COMMENT_FIELDS} FROM comments c JOIN users u ON u.id = c.user_id \
         WHERE c.post_id = $1 ORDER BY c.created_at, c.id"
    ))
    .bind(post)
    .fetch_all(pool)
    .await
    .map_err(AppError::from)?;
    Ok(rows)
}
