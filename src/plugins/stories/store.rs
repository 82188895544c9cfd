use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::error::StoryError;
use super::models::Story;

/// Which rows an archival sweep may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScope {
    All,
    Owner(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
    NotOwner,
}

/// Persistence for stories. Implementations must make `archive_expired` a
/// single atomic conditional update, and run `toggle_highlight` and
/// `delete_owned` against one locked row.
#[async_trait]
pub trait StoryStore: Send + Sync + 'static {
    async fn insert(&self, owner: Uuid, media: &str, created_at: DateTime<Utc>) -> Result<Story, StoryError>;

    /// Marks every unarchived story in `scope` created at or before `cutoff`
    /// as archived. Returns the number of rows changed.
    async fn archive_expired(&self, cutoff: DateTime<Utc>, scope: SweepScope) -> Result<u64, StoryError>;

    /// Unarchived stories of `owners` with `cutoff < created_at < now`, newest first.
    async fn list_active(
        &self,
        owners: &[Uuid],
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, StoryError>;

    async fn list_archived(&self, owner: Uuid) -> Result<Vec<Story>, StoryError>;

    async fn list_highlighted(&self, owner: Uuid) -> Result<Vec<Story>, StoryError>;

    /// Flips `is_highlighted` on an archived story of `owner`. `None` when no
    /// such story exists.
    async fn toggle_highlight(&self, owner: Uuid, id: Uuid) -> Result<Option<bool>, StoryError>;

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<DeleteOutcome, StoryError>;
}

pub type DynStoryStore = Arc<dyn StoryStore>;
