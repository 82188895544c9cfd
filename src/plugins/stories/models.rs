use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A story row as persisted, plus the owner's profile picture.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Story {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub media: String,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
    pub is_highlighted: bool,
    #[sqlx(default)]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Active,
    Archived,
    Highlighted,
}

impl Story {
    pub fn state(&self) -> StoryState {
        match (self.is_archived, self.is_highlighted) {
            (false, _) => StoryState::Active,
            (true, false) => StoryState::Archived,
            (true, true) => StoryState::Highlighted,
        }
    }
}

/// Feed item.
#[derive(Serialize, Deserialize, Debug)]
pub struct StoryDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_pic: Option<String>,
    pub media: String,
    pub is_user_story: bool,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

impl StoryDto {
    pub fn project(story: Story, viewer: Uuid) -> Self {
        Self {
            is_user_story: story.owner_id == viewer,
            id: story.id,
            user_id: story.owner_id,
            profile_pic: story.profile_pic,
            media: story.media,
            created_at: story.created_at,
            is_archived: story.is_archived,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ArchiveStoryDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_pic: Option<String>,
    pub media: String,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

impl From<Story> for ArchiveStoryDto {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            user_id: story.owner_id,
            profile_pic: story.profile_pic,
            media: story.media,
            created_at: story.created_at,
            is_archived: story.is_archived,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HighlightStoryDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_pic: Option<String>,
    pub media: String,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
    pub is_highlighted: bool,
}

impl From<Story> for HighlightStoryDto {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            user_id: story.owner_id,
            profile_pic: story.profile_pic,
            media: story.media,
            created_at: story.created_at,
            is_archived: story.is_archived,
            is_highlighted: story.is_highlighted,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct HighlightToggle {
    pub story_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HighlightToggled {
    pub story_id: Uuid,
    pub is_highlighted: bool,
}
