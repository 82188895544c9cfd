use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Multipart field names that carry post media.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "images" | "image" => Some(MediaKind::Image),
            "videos" | "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A post with its counters, as seen by one viewer.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub username: String,
    pub profile_pic: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comment_count: i64,
    pub has_liked: bool,
    pub has_saved: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct PostMediaRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub kind: String,
    pub media: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: Uuid,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PostDto {
    pub id: Uuid,
    pub user: Author,
    pub description: String,
    pub images: Vec<MediaItem>,
    pub videos: Vec<MediaItem>,
    pub likes_count: i64,
    pub comment_count: i64,
    pub has_liked: bool,
    pub has_saved: bool,
    pub created_at: DateTime<Utc>,
}

impl PostDto {
    /// `media` must belong to `row` and be in display order.
    pub fn assemble(row: PostRow, media: Vec<PostMediaRow>) -> Self {
        let (mut images, mut videos) = (Vec::new(), Vec::new());
        for m in media {
            let item = MediaItem { id: m.id, url: m.media };
            if m.kind == MediaKind::Video.as_str() {
                videos.push(item);
            } else {
                images.push(item);
            }
        }
        Self {
            id: row.id,
            user: Author { id: row.owner_id, username: row.username, profile_pic: row.profile_pic },
            description: row.description,
            images,
            videos,
            likes_count: row.likes_count,
            comment_count: row.comment_count,
            has_liked: row.has_liked,
            has_saved: row.has_saved,
            created_at: row.created_at,
        }
    }
}

/// Explore grid tile.
#[derive(Serialize, Deserialize, Debug)]
pub struct ExploreItem {
    pub id: Uuid,
    pub images: Vec<MediaItem>,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub description: String,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LikeToggled {
    pub post_id: Uuid,
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SaveToggled {
    pub post_id: Uuid,
    pub saved: bool,
}

#[derive(Deserialize)]
pub struct NewComment {
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, FromRow)]
pub struct CommentDto {
    pub id: Uuid,
    pub post_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    pub profile_pic: Option<String>,
}
