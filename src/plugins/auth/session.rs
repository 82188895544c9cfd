//! Server-side revocation of otherwise stateless tokens.
//!
//! Logging out records the token's id in the [`Cache`](crate::cache::Cache)
//! until the token would have expired anyway. Every authenticated request
//! checks that record, so a revoked token stops working on all plugins.

use std::time::Duration;
use uuid::Uuid;

use crate::cache::DynCache;

#[derive(Clone)]
pub struct Revocations {
    cache: DynCache,
}

impl Revocations {
    pub fn new(cache: DynCache) -> Self {
        Self { cache }
    }

    fn key(token_id: Uuid) -> String {
        format!("auth:revoked:{token_id}")
    }

    /// Revokes `token_id` until `expires_at` (unix seconds).
    pub async fn revoke(&self, token_id: Uuid, expires_at: i64) -> anyhow::Result<()> {
        let remaining = (expires_at - chrono::Utc::now().timestamp()).max(1) as u64;
        self.cache
            .set(&Self::key(token_id), vec![1], Some(Duration::from_secs(remaining)))
            .await
    }

    pub async fn is_revoked(&self, token_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.cache.get(&Self::key(token_id)).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    #[tokio::test]
    async fn revoked_tokens_are_remembered_individually() -> anyhow::Result<()> {
        let revocations = Revocations::new(InMemoryCache::new(8).into_arc());
        let (gone, kept) = (Uuid::new_v4(), Uuid::new_v4());
        let exp = chrono::Utc::now().timestamp() + 3600;

        revocations.revoke(gone, exp).await?;
        assert!(revocations.is_revoked(gone).await?);
        assert!(!revocations.is_revoked(kept).await?);
        Ok(())
    }
}
