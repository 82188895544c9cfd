use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::http_error::AppError;
use crate::plugins::auth::handlers::AuthUser;
use crate::plugins::media::store::DynMediaStore;

#[derive(Serialize, Debug)]
pub struct Uploaded {
    pub uploaded: Vec<String>,
}

/// Stores every file field of a multipart body and returns their references.
/// The body is read in full first, so a bad field stores nothing.
pub async fn upload_files(
    Extension(media): Extension<DynMediaStore>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Uploaded>), AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::bad_request(format!("{filename} is empty")));
        }
        files.push((filename, data));
    }
    if files.is_empty() {
        return Err(AppError::bad_request("no files in upload"));
    }

    let mut uploaded: Vec<String> = Vec::with_capacity(files.len());
    for (filename, data) in &files {
        let reference = media
            .put(Some(filename.as_str()), data)
            .await
            .map_err(|e| AppError::internal(format!("write error: {}", e)))?;
        uploaded.push(reference);
    }
    tracing::info!(user_id = %auth.user_id, count = uploaded.len(), "media uploaded");
    Ok((StatusCode::CREATED, Json(Uploaded { uploaded })))
}
