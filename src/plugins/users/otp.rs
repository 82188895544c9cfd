//! One-time codes for account activation and password reset.
//!
//! Codes live in the [`Cache`](crate::cache::Cache) for [`OTP_TTL`] and are
//! consumed on successful verification. After [`MAX_OTP_ATTEMPTS`] wrong
//! guesses the pending code is thrown away. Delivery goes through an
//! [`OtpNotifier`]; the default one only writes to the log.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::DynCache;

pub const OTP_TTL: Duration = Duration::from_secs(300);

pub const MAX_OTP_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Email,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Activation,
    PasswordReset,
}

impl OtpPurpose {
    fn key(self, user_id: Uuid) -> String {
        let ns = match self {
            OtpPurpose::Activation => "activation",
            OtpPurpose::PasswordReset => "password_reset",
        };
        format!("otp:{ns}:{user_id}")
    }

    fn tries_key(self, user_id: Uuid) -> String {
        format!("{}:tries", self.key(user_id))
    }
}

#[async_trait]
pub trait OtpNotifier: Send + Sync + 'static {
    async fn send(&self, channel: Channel, address: &str, code: &str) -> anyhow::Result<()>;
}

pub type DynNotifier = Arc<dyn OtpNotifier>;

/// Writes codes to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl OtpNotifier for LogNotifier {
    async fn send(&self, channel: Channel, address: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(?channel, address, code, "one-time code issued");
        Ok(())
    }
}

#[derive(Clone)]
pub struct OtpService {
    cache: DynCache,
    notifier: DynNotifier,
}

impl OtpService {
    pub fn new(cache: DynCache, notifier: DynNotifier) -> Self {
        Self { cache, notifier }
    }

    /// Generates a fresh six-digit code, replacing any pending one for the
    /// same user and purpose, and delivers it.
    pub async fn issue(&self, user_id: Uuid, purpose: OtpPurpose, channel: Channel, address: &str) -> anyhow::Result<()> {
        let code = rand::thread_rng().gen_range(100_000..=999_999u32).to_string();
        self.cache.delete(&purpose.tries_key(user_id)).await?;
        self.cache
            .set(&purpose.key(user_id), code.clone().into_bytes(), Some(OTP_TTL))
            .await?;
        self.notifier.send(channel, address, &code).await
    }

    /// True when `code` matches the pending one. A matching code is consumed.
    pub async fn verify(&self, user_id: Uuid, purpose: OtpPurpose, code: &str) -> anyhow::Result<bool> {
        let key = purpose.key(user_id);
        let Some(stored) = self.cache.get(&key).await? else {
            return Ok(false);
        };
        let tries_key = purpose.tries_key(user_id);
        if stored != code.trim().as_bytes() {
            self.record_miss(&key, &tries_key).await?;
            return Ok(false);
        }
        self.cache.delete(&key).await?;
        self.cache.delete(&tries_key).await?;
        Ok(true)
    }

    async fn record_miss(&self, key: &str, tries_key: &str) -> anyhow::Result<()> {
        let tries = self
            .cache
            .get(tries_key)
            .await?
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
            + 1;
        if tries >= MAX_OTP_ATTEMPTS {
            tracing::warn!(key, tries, "too many wrong one-time codes, code invalidated");
            self.cache.delete(key).await?;
            self.cache.delete(tries_key).await?;
        } else {
            self.cache.set(tries_key, tries.to_string().into_bytes(), Some(OTP_TTL)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Remembers every code it was asked to send.
    #[derive(Default)]
    pub struct CapturingNotifier {
        pub sent: Mutex<Vec<(Channel, String, String)>>,
    }

    impl CapturingNotifier {
        pub fn last_code(&self) -> Option<String> {
            self.sent.lock().last().map(|(_, _, code)| code.clone())
        }
    }

    #[async_trait]
    impl OtpNotifier for CapturingNotifier {
        async fn send(&self, channel: Channel, address: &str, code: &str) -> anyhow::Result<()> {
            self.sent.lock().push((channel, address.to_string(), code.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CapturingNotifier;
    use super::*;
    use crate::cache::InMemoryCache;

    fn service() -> (OtpService, Arc<CapturingNotifier>) {
        let notifier = Arc::new(CapturingNotifier::default());
        let svc = OtpService::new(InMemoryCache::new(16).into_arc(), notifier.clone());
        (svc, notifier)
    }

    #[tokio::test]
    async fn issued_code_verifies_once() -> anyhow::Result<()> {
        let (svc, notifier) = service();
        let user = Uuid::new_v4();
        svc.issue(user, OtpPurpose::Activation, Channel::Email, "a@example.com").await?;

        let code = notifier.last_code().expect("code sent");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        assert!(!svc.verify(user, OtpPurpose::Activation, "000000x").await?);
        assert!(svc.verify(user, OtpPurpose::Activation, &code).await?);
        assert!(!svc.verify(user, OtpPurpose::Activation, &code).await?);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_wrong_guesses_burn_the_code() -> anyhow::Result<()> {
        let (svc, notifier) = service();
        let user = Uuid::new_v4();
        svc.issue(user, OtpPurpose::Activation, Channel::Email, "a@example.com").await?;
        let code = notifier.last_code().expect("code sent");

        for _ in 0..MAX_OTP_ATTEMPTS {
            assert!(!svc.verify(user, OtpPurpose::Activation, "wrong").await?);
        }
        assert!(!svc.verify(user, OtpPurpose::Activation, &code).await?);

        // a fresh code starts a fresh count
        svc.issue(user, OtpPurpose::Activation, Channel::Email, "a@example.com").await?;
        let code = notifier.last_code().expect("code sent");
        for _ in 0..MAX_OTP_ATTEMPTS - 1 {
            assert!(!svc.verify(user, OtpPurpose::Activation, "wrong").await?);
        }
        assert!(svc.verify(user, OtpPurpose::Activation, &code).await?);
        Ok(())
    }

    #[tokio::test]
    async fn purposes_do_not_share_codes() -> anyhow::Result<()> {
        let (svc, notifier) = service();
        let user = Uuid::new_v4();
        svc.issue(user, OtpPurpose::PasswordReset, Channel::Sms, "+15550100").await?;
        let code = notifier.last_code().expect("code sent");

        assert!(!svc.verify(user, OtpPurpose::Activation, &code).await?);
        assert!(svc.verify(user, OtpPurpose::PasswordReset, &code).await?);
        assert_eq!(notifier.sent.lock()[0].0, Channel::Sms);
        Ok(())
    }
}
