//! Story visibility window, archival sweep and highlight toggling.
//!
//! A story is `Active` for 24 hours after creation. Any read that lists
//! active or archived stories first runs [`StoryLifecycle::sweep_expired_stories`],
//! which archives every story whose window has closed. Owners may then
//! flip archived stories in and out of their highlights, and may delete a
//! story in any state. Media must already be in the [`MediaStore`] before
//! a story can point at it.
//!
//! [`MediaStore`]: crate::plugins::media::MediaStore

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::clock::DynClock;
use super::error::StoryError;
use super::models::Story;
use super::store::{DeleteOutcome, DynStoryStore, SweepScope};
use crate::plugins::media::store::DynMediaStore;
use crate::plugins::social::graph::DynFollowGraph;

/// How long a story stays in the feed.
pub const VISIBILITY_WINDOW_HOURS: i64 = 24;

const MAX_MEDIA_REF_LEN: usize = 512;

#[derive(Clone)]
pub struct StoryLifecycle {
    store: DynStoryStore,
    graph: DynFollowGraph,
    clock: DynClock,
    media: DynMediaStore,
}

impl StoryLifecycle {
    pub fn new(store: DynStoryStore, graph: DynFollowGraph, clock: DynClock, media: DynMediaStore) -> Self {
        Self { store, graph, clock, media }
    }

    /// Stories created at or before this instant are expired.
    fn cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::hours(VISIBILITY_WINDOW_HOURS)
    }

    /// Archives every expired story in `scope`. Safe to run concurrently;
    /// a second sweep over the same rows changes nothing.
    pub async fn sweep_expired_stories(&self, scope: SweepScope) -> Result<u64, StoryError> {
        let cutoff = Self::cutoff(self.clock.now());
        let archived = self.store.archive_expired(cutoff, scope).await?;
        if archived > 0 {
            debug!(archived, %cutoff, ?scope, "archived expired stories");
        }
        Ok(archived)
    }

    // A failed sweep leaves rows stale until the next read; readers still
    // filter on the cutoff, so nothing expired is served as active.
    async fn sweep_before_read(&self, scope: SweepScope) {
        if let Err(e) = self.sweep_expired_stories(scope).await {
            warn!(error = %e, ?scope, "story sweep failed, will retry on next read");
        }
    }

    /// Creates a story on media that is already stored.
    pub async fn create(&self, owner: Uuid, media_ref: &str) -> Result<Story, StoryError> {
        let media = validate_media_ref(media_ref)?;
        if !self.media.exists(media).await.map_err(StoryError::Media)? {
            return Err(StoryError::Validation("media reference does not point at stored media".into()));
        }
        let story = self.store.insert(owner, media, self.clock.now()).await?;
        debug!(story_id = %story.id, %owner, "story created");
        Ok(story)
    }

    /// Stores an uploaded blob and creates a story on it. The blob is
    /// dropped again when the story cannot be created.
    pub async fn create_from_upload(
        &self,
        owner: Uuid,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Story, StoryError> {
        if bytes.is_empty() {
            return Err(StoryError::Validation("uploaded media is empty".into()));
        }
        let reference = self.media.put(original_name, bytes).await.map_err(StoryError::Media)?;
        match self.create(owner, &reference).await {
            Ok(story) => Ok(story),
            Err(e) => {
                if let Err(cleanup) = self.media.remove(&reference).await {
                    warn!(error = %cleanup, %reference, "could not drop media of a failed story");
                }
                Err(e)
            }
        }
    }

    /// The viewer's own active stories plus those of everyone they follow,
    /// newest first.
    pub async fn list_active_feed(&self, viewer: Uuid) -> Result<Vec<Story>, StoryError> {
        self.sweep_before_read(SweepScope::All).await;

        let now = self.clock.now();
        let mut owners = self.graph.followees(viewer).await?;
        owners.push(viewer);
        self.store.list_active(&owners, Self::cutoff(now), now).await
    }

    pub async fn list_archive(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        self.sweep_before_read(SweepScope::Owner(owner)).await;
        self.store.list_archived(owner).await
    }

    pub async fn list_highlights(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        self.store.list_highlighted(owner).await
    }

    /// Flips the highlight flag of one of `owner`'s archived stories and
    /// returns the new value.
    pub async fn toggle_highlight(&self, owner: Uuid, story_id: Uuid) -> Result<bool, StoryError> {
        // a story past its window counts as archived even if no read has swept it yet
        self.sweep_before_read(SweepScope::Owner(owner)).await;

        let highlighted = self
            .store
            .toggle_highlight(owner, story_id)
            .await?
            .ok_or(StoryError::NotFound(story_id))?;
        debug!(%story_id, highlighted, "story highlight toggled");
        Ok(highlighted)
    }

    pub async fn delete(&self, owner: Uuid, story_id: Uuid) -> Result<(), StoryError> {
        match self.store.delete_owned(owner, story_id).await? {
            DeleteOutcome::Deleted => {
                debug!(%story_id, "story deleted");
                Ok(())
            }
            DeleteOutcome::Missing => Err(StoryError::NotFound(story_id)),
            DeleteOutcome::NotOwner => Err(StoryError::Permission(story_id)),
        }
    }
}

fn validate_media_ref(media_ref: &str) -> Result<&str, StoryError> {
    let media = media_ref.trim();
    if media.is_empty() {
        return Err(StoryError::Validation("media reference is empty".into()));
    }
    if media.len() > MAX_MEDIA_REF_LEN {
        return Err(StoryError::Validation(format!("media reference exceeds {MAX_MEDIA_REF_LEN} bytes")));
    }
    if media.chars().any(char::is_control) {
        return Err(StoryError::Validation("media reference contains control characters".into()));
    }
    Ok(media)
}
