use axum::body::Bytes;
use axum::extract::{Multipart, Path};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::AuthUser;
use crate::plugins::stories::error::StoryError;
use crate::plugins::stories::lifecycle::StoryLifecycle;
use crate::plugins::stories::models::{
    ArchiveStoryDto, HighlightStoryDto, HighlightToggle, HighlightToggled, StoryDto,
};

enum MediaInput {
    Upload { file_name: Option<String>, bytes: Bytes },
    Reference(String),
}

/// Accepts either an uploaded file in the `media` field or the reference of
/// an earlier upload in the `media_ref` field, but not both and not twice.
/// Nothing is stored until the whole body has been read.
pub async fn create_story(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoryDto>), AppError> {
    let mut input: Option<MediaInput> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        let next = match name.as_deref() {
            Some("media") => {
                let file_name = field.file_name().map(str::to_string);
                MediaInput::Upload { file_name, bytes: field.bytes().await? }
            }
            Some("media_ref") => MediaInput::Reference(field.text().await?),
            _ => continue,
        };
        if input.replace(next).is_some() {
            return Err(AppError::bad_request("send one media file or one media_ref").with_code("duplicate_media"));
        }
    }

    let story = match input {
        Some(MediaInput::Upload { file_name, bytes }) => {
            lifecycle.create_from_upload(auth.user_id, file_name.as_deref(), &bytes).await?
        }
        Some(MediaInput::Reference(reference)) => lifecycle.create(auth.user_id, &reference).await?,
        None => return Err(StoryError::Validation("a media file or media_ref is required".into()).into()),
    };
    Ok((StatusCode::CREATED, Json(StoryDto::project(story, auth.user_id))))
}

pub async fn list_feed(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
) -> Result<Json<Vec<StoryDto>>, AppError> {
    let stories = lifecycle.list_active_feed(auth.user_id).await?;
    Ok(Json(stories.into_iter().map(|s| StoryDto::project(s, auth.user_id)).collect()))
}

pub async fn list_archive(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
) -> Result<Json<Vec<ArchiveStoryDto>>, AppError> {
    let stories = lifecycle.list_archive(auth.user_id).await?;
    Ok(Json(stories.into_iter().map(ArchiveStoryDto::from).collect()))
}

pub async fn list_highlights(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
) -> Result<Json<Vec<HighlightStoryDto>>, AppError> {
    let stories = lifecycle.list_highlights(auth.user_id).await?;
    Ok(Json(stories.into_iter().map(HighlightStoryDto::from).collect()))
}

pub async fn toggle_highlight(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
    Json(req): Json<HighlightToggle>,
) -> Result<Json<HighlightToggled>, AppError> {
    let is_highlighted = lifecycle.toggle_highlight(auth.user_id, req.story_id).await?;
    Ok(Json(HighlightToggled { story_id: req.story_id, is_highlighted }))
}

pub async fn delete_story(
    Extension(lifecycle): Extension<StoryLifecycle>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lifecycle.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
