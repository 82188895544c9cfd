use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::error::StoryError;
use super::models::Story;
use super::store::{DeleteOutcome, StoryStore, SweepScope};

macro_rules! story_fields {
    () => {
        "s.id, s.owner_id, s.media, s.created_at, s.is_archived, s.is_highlighted, u.image AS profile_pic"
    };
}

const STORY_SELECT: &str =
    concat!("SELECT ", story_fields!(), " FROM stories s LEFT JOIN users u ON u.id = s.owner_id");

const INSERT_STORY: &str = concat!(
    "WITH s AS (INSERT INTO stories (owner_id, media, created_at) VALUES ($1, $2, $3) RETURNING *) ",
    "SELECT ",
    story_fields!(),
    " FROM s LEFT JOIN users u ON u.id = s.owner_id"
);

// lock_not_available, serialization_failure, deadlock_detected
const CONTENTION_CODES: [&str; 3] = ["55P03", "40001", "40P01"];

fn contended(id: Uuid, e: sqlx::Error) -> StoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref().is_some_and(|c| CONTENTION_CODES.contains(&c)) {
            return StoryError::Conflict(id);
        }
    }
    StoryError::Storage(e)
}

#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn insert(&self, owner: Uuid, media: &str, created_at: DateTime<Utc>) -> Result<Story, StoryError> {
        let story = sqlx::query_as::<_, Story>(INSERT_STORY)
            .bind(owner)
            .bind(media)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(story)
    }

    async fn archive_expired(&self, cutoff: DateTime<Utc>, scope: SweepScope) -> Result<u64, StoryError> {
        let result = match scope {
            SweepScope::All => {
                sqlx::query("UPDATE stories SET is_archived = TRUE WHERE NOT is_archived AND created_at <= $1")
                    .bind(cutoff)
                    .execute(&self.pool)
                    .await?
            }
            SweepScope::Owner(owner) => {
                sqlx::query("UPDATE stories SET is_archived = TRUE WHERE NOT is_archived AND created_at <= $1 AND owner_id = $2")
                    .bind(cutoff)
                    .bind(owner)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        owners: &[Uuid],
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Story>, StoryError> {
        let sql = format!(
            "{STORY_SELECT} WHERE s.owner_id = ANY($1) AND NOT s.is_archived AND s.created_at < $2 AND s.created_at > $3 ORDER BY s.created_at DESC"
        );
        let items = sqlx::query_as::<_, Story>(&sql)
            .bind(owners)
            .bind(now)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn list_archived(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        let sql = format!("{STORY_SELECT} WHERE s.owner_id = $1 AND s.is_archived ORDER BY s.created_at DESC");
        let items = sqlx::query_as::<_, Story>(&sql).bind(owner).fetch_all(&self.pool).await?;
        Ok(items)
    }

    async fn list_highlighted(&self, owner: Uuid) -> Result<Vec<Story>, StoryError> {
        let sql = format!("{STORY_SELECT} WHERE s.owner_id = $1 AND s.is_highlighted ORDER BY s.created_at DESC");
        let items = sqlx::query_as::<_, Story>(&sql).bind(owner).fetch_all(&self.pool).await?;
        Ok(items)
    }

    async fn toggle_highlight(&self, owner: Uuid, id: Uuid) -> Result<Option<bool>, StoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<bool> = sqlx::query_scalar(
            "SELECT is_highlighted FROM stories WHERE id = $1 AND owner_id = $2 AND is_archived FOR UPDATE NOWAIT",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| contended(id, e))?;

        let Some(current) = current else {
            return Ok(None);
        };

        let next: bool = sqlx::query_scalar("UPDATE stories SET is_highlighted = $1 WHERE id = $2 RETURNING is_highlighted")
            .bind(!current)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| contended(id, e))?;

        tx.commit().await.map_err(|e| contended(id, e))?;
        Ok(Some(next))
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<DeleteOutcome, StoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM stories WHERE id = $1 FOR UPDATE NOWAIT")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| contended(id, e))?;

        match found {
            None => Ok(DeleteOutcome::Missing),
            Some(actual) if actual != owner => Ok(DeleteOutcome::NotOwner),
            Some(_) => {
                sqlx::query("DELETE FROM stories WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| contended(id, e))?;
                tx.commit().await.map_err(|e| contended(id, e))?;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
