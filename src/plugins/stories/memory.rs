use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::StoryError;
use super::models::Story;
use super::store::{DeleteOutcome, StoryStore, SweepScope};

/// Process-local story store. Every operation runs under one lock, which
/// gives the same atomicity the database store gets from its statements.
#[derive(Default)]
pub struct InMemoryStoryStore {
    stories: Mutex<HashMap<Uuid, Story>>,
    fail_sweeps: Mutex<bool>,
}

impl InMemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sweeps fail with a storage error, for exercising
    /// the read paths that tolerate a failed sweep.
    pub fn set_sweep_failure(&self, fail: bool) {
        *self.fail_sweeps.lock() = fail;
    }

    pub fn get(&self, id: Uuid) -> Option<Story> {
        self.stories.lock().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Story> {
        self.stories.lock().values().cloned().collect()
    }

    fn collect_newest_first(&self, keep: impl Fn(&Story) -> bool) -> Vec<Story> {
        let mut items: Vec<Story> = self.stories.lock().values().filter(|s| keep(s)).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        items
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn insert(&self, owner: Uuid, media: &str, created_at: DateTime<Utc>) -> Result<Story, StoryError> {
        let story = Story {
            id: Uuid::new_v4(),
            owner_id: owner,
            media: media.to_string(),
            created_at,
            is_archived: false,
            is_highlighted: false,
            profile_pic: None,
        };
        self.stories.lock().insert(story.id, story.clone());
        Ok(story)
    }

    async fn archive_expired(&self, cutoff: DateTime<Utc>, scope: SweepScope) -> Result<u64, StoryError> {
        if *self.fail_sweeps.lock() {
            return Err(StoryError::Storage(sqlx::Error::PoolTimedOut));
        }
        let mut changed = 0;
        for story in self.stories.lock().values_mut() {
            let in_scope = match scope {
                SweepScope::All => true,
                SweepScope::Owner(owner) => story.owner_id == owner,
            };
            if in_scope && !story.is_archived && story.created_at <= cutoff {
                story.is_archived = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn list_active(
        &self,
        owners: &[Uuid],
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, StoryError> {
        Ok(self.collect_newest_first(|s| {
            owners.contains(&s.owner_id) && !s.is_archived && s.created_at < now && s.created_at > cutoff
        }))
    }

    async fn list_archived(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        Ok(self.collect_newest_first(|s| s.owner_id == owner && s.is_archived))
    }

    async fn list_highlighted(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        Ok(self.collect_newest_first(|s| s.owner_id == owner && s.is_highlighted))
    }

    async fn toggle_highlight(&self, owner: Uuid, id: Uuid) -> Result<Option<bool>, StoryError> {
        let mut stories = self.stories.lock();
        match stories.get_mut(&id) {
            Some(story) if story.owner_id == owner && story.is_archived => {
                story.is_highlighted = !story.is_highlighted;
                Ok(Some(story.is_highlighted))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<DeleteOutcome, StoryError> {
        let mut stories = self.stories.lock();
        match stories.get(&id) {
            None => Ok(DeleteOutcome::Missing),
            Some(story) if story.owner_id != owner => Ok(DeleteOutcome::NotOwner),
            Some(_) => {
                stories.remove(&id);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
