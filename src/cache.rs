use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Byte-oriented key/value store with optional expiry.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

pub type DynCache = Arc<dyn Cache>;

mod inmem {
    use super::*;
    use lru::LruCache;
    use parking_lot::Mutex;
    use std::num::NonZeroUsize;
    use std::time::Instant;

    struct Entry {
        value: Vec<u8>,
        expires_at: Option<Instant>,
    }

    impl Entry {
        fn is_live(&self, now: Instant) -> bool {
            self.expires_at.is_none_or(|at| now < at)
        }
    }

    pub struct InMemoryCache {
        inner: Mutex<LruCache<String, Entry>>,
    }

    impl InMemoryCache {
        pub fn new(capacity: usize) -> Self {
            let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
            Self {
                inner: Mutex::new(LruCache::new(cap)),
            }
        }

        pub fn into_arc(self) -> DynCache {
            Arc::new(self)
        }
    }

    #[async_trait]
    impl Cache for InMemoryCache {
        async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            let mut guard = self.inner.lock();
            match guard.get(key) {
                Some(entry) if entry.is_live(Instant::now()) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
            guard.pop(key);
            Ok(None)
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> anyhow::Result<()> {
            let expires_at = ttl.map(|d| Instant::now() + d);
            self.inner.lock().put(key.to_string(), Entry { value, expires_at });
            Ok(())
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            self.inner.lock().pop(key);
            Ok(())
        }
    }
}

pub use inmem::InMemoryCache;

mod redis_backend {
    use super::*;
    use redis::AsyncCommands;
    use redis::Client;
    use redis::aio::MultiplexedConnection;

    /// Redis-backed cache. The multiplexed connection is cheap to clone, so
    /// each call works on its own handle.
    pub struct RedisCache {
        conn: MultiplexedConnection,
    }

    impl RedisCache {
        pub async fn new(url: &str) -> anyhow::Result<Self> {
            let client = Client::open(url)?;
            let conn = client.get_multiplexed_tokio_connection().await?;
            Ok(Self { conn })
        }

        pub fn into_arc(self) -> DynCache {
            Arc::new(self)
        }
    }

    #[async_trait]
    impl Cache for RedisCache {
        async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            let mut conn = self.conn.clone();
            let res: Option<Vec<u8>> = conn.get(key).await?;
            Ok(res)
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> anyhow::Result<()> {
            let mut conn = self.conn.clone();
            match ttl {
                // SETEX rejects a zero expiry
                Some(d) => {
                    let secs = d.as_secs().max(1);
                    let _: () = redis::cmd("SETEX")
                        .arg(key)
                        .arg(secs)
                        .arg(value)
                        .query_async(&mut conn)
                        .await?;
                }
                None => {
                    let _: () = conn.set(key, value).await?;
                }
            }
            Ok(())
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            let mut conn = self.conn.clone();
            let _: () = conn.del(key).await?;
            Ok(())
        }
    }
}

pub use redis_backend::RedisCache;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_entries_read_as_missing() -> anyhow::Result<()> {
        let cache = InMemoryCache::new(8);
        cache.set("short", b"a".to_vec(), Some(Duration::from_millis(20))).await?;
        cache.set("forever", b"b".to_vec(), None).await?;
        assert_eq!(cache.get("short").await?, Some(b"a".to_vec()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("short").await?, None);
        assert_eq!(cache.get("forever").await?, Some(b"b".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn capacity_evicts_least_recent() -> anyhow::Result<()> {
        let cache = InMemoryCache::new(2);
        cache.set("a", vec![1], None).await?;
        cache.set("b", vec![2], None).await?;
        cache.get("a").await?;
        cache.set("c", vec![3], None).await?;
        assert_eq!(cache.get("b").await?, None);
        assert_eq!(cache.get("a").await?, Some(vec![1]));
        cache.delete("a").await?;
        assert_eq!(cache.get("a").await?, None);
        Ok(())
    }
}
