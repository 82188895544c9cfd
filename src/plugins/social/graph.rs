use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Read side of the follow graph.
#[async_trait]
pub trait FollowGraph: Send + Sync + 'static {
    /// Users that `user` follows.
    async fn followees(&self, user: Uuid) -> Result<Vec<Uuid>, sqlx::Error>;
}

pub type DynFollowGraph = Arc<dyn FollowGraph>;

#[derive(Clone)]
pub struct PgFollowGraph {
    pool: PgPool,
}

impl PgFollowGraph {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowGraph for PgFollowGraph {
    async fn followees(&self, user: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT followee_id FROM follows WHERE follower_id = $1")
            .bind(user)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Default)]
pub struct InMemoryFollowGraph {
    edges: RwLock<HashSet<(Uuid, Uuid)>>,
}

impl InMemoryFollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow(&self, follower: Uuid, followee: Uuid) {
        if follower != followee {
            self.edges.write().insert((follower, followee));
        }
    }

    pub fn unfollow(&self, follower: Uuid, followee: Uuid) {
        self.edges.write().remove(&(follower, followee));
    }
}

#[async_trait]
impl FollowGraph for InMemoryFollowGraph {
    async fn followees(&self, user: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|(follower, _)| *follower == user)
            .map(|(_, followee)| *followee)
            .collect())
    }
}
