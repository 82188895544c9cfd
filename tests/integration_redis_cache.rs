use std::time::Duration;

use instaworld_api::plugins::users::otp::{Channel, OtpNotifier, OtpPurpose, OtpService};
use parking_lot::Mutex;
use std::sync::Arc;

async fn redis_or_skip(test_name: &str) -> Option<instaworld_api::cache::DynCache> {
    let redis_url = match std::env::var("REDIS_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("SKIPPING {test_name}: REDIS_URL not set");
            return None;
        }
    };
    match instaworld_api::cache::RedisCache::new(&redis_url).await {
        Ok(c) => Some(c.into_arc()),
        Err(e) => {
            eprintln!("SKIPPING {test_name}: cannot connect to Redis: {}", e);
            None
        }
    }
}

#[tokio::test]
async fn redis_cache_get_set_delete_smoke() -> anyhow::Result<()> {
    let Some(cache) = redis_or_skip("redis_cache_get_set_delete_smoke").await else {
        return Ok(());
    };

    let key = format!("test:redis:smoke:{}", uuid::Uuid::new_v4());
    cache.set(&key, b"hello".to_vec(), Some(Duration::from_secs(5))).await?;
    assert_eq!(cache.get(&key).await?, Some(b"hello".to_vec()));
    cache.delete(&key).await?;
    assert_eq!(cache.get(&key).await?, None);
    Ok(())
}

#[derive(Default)]
struct LastCode(Mutex<Option<String>>);

#[async_trait::async_trait]
impl OtpNotifier for LastCode {
    async fn send(&self, _channel: Channel, _address: &str, code: &str) -> anyhow::Result<()> {
        *self.0.lock() = Some(code.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn otp_codes_round_trip_through_redis() -> anyhow::Result<()> {
    let Some(cache) = redis_or_skip("otp_codes_round_trip_through_redis").await else {
        return Ok(());
    };
    let notifier = Arc::new(LastCode::default());
    let otp = OtpService::new(cache, notifier.clone());
    let user = uuid::Uuid::new_v4();

    otp.issue(user, OtpPurpose::Activation, Channel::Email, "redis@example.com").await?;
    let code = notifier.0.lock().clone().expect("code sent");
    assert!(otp.verify(user, OtpPurpose::Activation, &code).await?);
    assert!(!otp.verify(user, OtpPurpose::Activation, &code).await?);
    Ok(())
}
