use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::AuthUser;
use crate::plugins::media::store::DynMediaStore;
use crate::plugins::posts::models::{
    CommentDto, ExploreItem, LikeToggled, ListQuery, MediaKind, NewComment, PostDto, SaveToggled, UpdatePost,
};
use crate::plugins::posts::repo::{self, Mark, Page, PostFilter};

#[derive(Clone)]
pub struct PostsState {
    pub pool: PgPool,
    pub media: DynMediaStore,
}

pub const MAX_DESCRIPTION_CHARS: usize = 2200;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_MEDIA_PER_POST: usize = 10;
const EXPLORE_SIZE: i64 = 50;

pub(crate) fn validate_description(description: &str) -> Result<&str, AppError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::bad_request("description is too long"));
    }
    Ok(description)
}

pub(crate) fn validate_comment(comment: &str) -> Result<&str, AppError> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(AppError::bad_request("comment is empty"));
    }
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::bad_request("comment is too long"));
    }
    Ok(comment)
}

pub(crate) struct Upload {
    pub kind: MediaKind,
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// A post needs a caption or at least one file, and every file must carry bytes.
pub(crate) fn validate_new_post(description: &str, files: &[Upload]) -> Result<(), AppError> {
    if files.len() > MAX_MEDIA_PER_POST {
        return Err(AppError::bad_request(format!("at most {MAX_MEDIA_PER_POST} files per post")).with_code("invalid_media"));
    }
    if files.iter().any(|f| f.bytes.is_empty()) {
        return Err(AppError::bad_request("media file is empty").with_code("invalid_media"));
    }
    if files.is_empty() && description.is_empty() {
        return Err(AppError::bad_request("a post needs a description or media").with_code("invalid_media"));
    }
    Ok(())
}

async fn discard(media: &DynMediaStore, references: &[String]) {
    for reference in references {
        if let Err(e) = media.remove(reference).await {
            tracing::warn!(error = %e, %reference, "could not remove post media");
        }
    }
}

pub async fn create_post(
    State(state): State<PostsState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostDto>), AppError> {
    let mut description: Option<String> = None;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("description") => {
                let text = field.text().await?;
                if description.replace(text).is_some() {
                    return Err(AppError::bad_request("send a single description"));
                }
            }
            Some(other) => {
                if let Some(kind) = MediaKind::from_field(other) {
                    let file_name = field.file_name().map(str::to_string);
                    files.push(Upload { kind, file_name, bytes: field.bytes().await? });
                }
            }
            None => {}
        }
    }

    let description = validate_description(description.as_deref().unwrap_or(""))?;
    validate_new_post(description, &files)?;

    let mut stored: Vec<(MediaKind, String)> = Vec::with_capacity(files.len());
    for file in &files {
        match state.media.put(file.file_name.as_deref(), &file.bytes).await {
            Ok(reference) => stored.push((file.kind, reference)),
            Err(e) => {
                let references: Vec<String> = stored.into_iter().map(|(_, r)| r).collect();
                discard(&state.media, &references).await;
                return Err(AppError::internal(format!("write error: {e}")));
            }
        }
    }

    let id = match repo::insert_post(&state.pool, auth.user_id, description, &stored).await {
        Ok(id) => id,
        Err(e) => {
            let references: Vec<String> = stored.into_iter().map(|(_, r)| r).collect();
            discard(&state.media, &references).await;
            return Err(e);
        }
    };
    tracing::info!(post_id = %id, owner = %auth.user_id, files = stored.len(), "post created");
    Ok((StatusCode::CREATED, Json(repo::fetch_post(&state.pool, auth.user_id, id).await?)))
}

/// `?user_id=` selects whose posts; defaults to the caller.
pub async fn list_by_owner(State(state): State<PostsState>, auth: AuthUser, Query(q): Query<ListQuery>) -> Result<Json<Vec<PostDto>>, AppError> {
    let owner = q.user_id.unwrap_or(auth.user_id);
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::Owner(owner), page).await?))
}

pub async fn list_for_user(
    State(state): State<PostsState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PostDto>>, AppError> {
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::Owner(user_id), page).await?))
}

pub async fn list_all(State(state): State<PostsState>, auth: AuthUser, Query(q): Query<ListQuery>) -> Result<Json<Vec<PostDto>>, AppError> {
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::Everyone, page).await?))
}

pub async fn feed(State(state): State<PostsState>, auth: AuthUser, Query(q): Query<ListQuery>) -> Result<Json<Vec<PostDto>>, AppError> {
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::Followees, page).await?))
}

pub async fn explore(State(state): State<PostsState>, auth: AuthUser) -> Result<Json<Vec<ExploreItem>>, AppError> {
    Ok(Json(repo::explore(&state.pool, auth.user_id, EXPLORE_SIZE).await?))
}

pub async fn liked(State(state): State<PostsState>, auth: AuthUser, Query(q): Query<ListQuery>) -> Result<Json<Vec<PostDto>>, AppError> {
    let user = q.user_id.unwrap_or(auth.user_id);
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::LikedBy(user), page).await?))
}

/// Saved collections are private to their owner.
pub async fn saved(State(state): State<PostsState>, auth: AuthUser, Query(q): Query<ListQuery>) -> Result<Json<Vec<PostDto>>, AppError> {
    if q.user_id.is_some_and(|user| user != auth.user_id) {
        return Err(AppError::new(StatusCode::FORBIDDEN, "saved posts are private").with_code("forbidden"));
    }
    let page = Page::new(q.limit, q.offset);
    Ok(Json(repo::list_posts(&state.pool, auth.user_id, PostFilter::SavedBy(auth.user_id), page).await?))
}

pub async fn get_post(State(state): State<PostsState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<PostDto>, AppError> {
    Ok(Json(repo::fetch_post(&state.pool, auth.user_id, id).await?))
}

pub async fn update_post(
    State(state): State<PostsState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdatePost>,
) -> Result<Json<PostDto>, AppError> {
    let description = validate_description(&update.description)?;
    repo::update_description(&state.pool, auth.user_id, id, description).await?;
    Ok(Json(repo::fetch_post(&state.pool, auth.user_id, id).await?))
}

pub async fn delete_post(State(state): State<PostsState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    let references = repo::delete_post(&state.pool, auth.user_id, id).await?;
    discard(&state.media, &references).await;
    tracing::info!(post_id = %id, owner = %auth.user_id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(State(state): State<PostsState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<LikeToggled>, AppError> {
    if !repo::post_exists(&state.pool, id).await? {
        return Err(repo::not_found());
    }
    let liked = repo::toggle_mark(&state.pool, Mark::Like, auth.user_id, id).await?;
    let likes_count = repo::likes_count(&state.pool, id).await?;
    Ok(Json(LikeToggled { post_id: id, liked, likes_count }))
}

pub async fn toggle_save(State(state): State<PostsState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<SaveToggled>, AppError> {
    if !repo::post_exists(&state.pool, id).await? {
        return Err(repo::not_found());
    }
    let saved = repo::toggle_mark(&state.pool, Mark::Save, auth.user_id, id).await?;
    Ok(Json(SaveToggled { post_id: id, saved }))
}

pub async fn list_comments(State(state): State<PostsState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Vec<CommentDto>>, AppError> {
    if !repo::post_exists(&state.pool, id).await? {
        return Err(repo::not_found());
    }
    Ok(Json(repo::comments(&state.pool, id).await?))
}

pub async fn add_comment(
    State(state): State<PostsState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<CommentDto>), AppError> {
    let body = validate_comment(&req.comment)?;
    if !repo::post_exists(&state.pool, id).await? {
        return Err(repo::not_found());
    }
    let comment = repo::add_comment(&state.pool, auth.user_id, id, body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
