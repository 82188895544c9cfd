#![allow(dead_code)]

use std::process::Command;
use std::sync::Once;

use instaworld_api::cache::InMemoryCache;
use instaworld_api::db;
use instaworld_api::kernel::{build_app, Plugin};
use instaworld_api::plugins::auth::{token, Revocations};
use instaworld_api::plugins::users::repo::{self as users_repo, NewUser};
use sqlx::PgPool;
use tokio::net::TcpListener;
use uuid::Uuid;

static JWT_INIT: Once = Once::new();
const JWT_SECRET_CONST: &str = "instaworld-test-secret";

pub fn init_jwt_secret() {
    JWT_INIT.call_once(|| {
        unsafe { std::env::set_var("JWT_SECRET", JWT_SECRET_CONST); }
    });
}

/// `None` (after printing why) when no test database is configured.
pub fn test_database_url(test_name: &str) -> Option<String> {
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("SKIPPING {test_name}: TEST_DATABASE_URL not set");
            None
        }
    }
}

pub struct TestDbGuard {
    maintenance_url: String,
    unique_db: String,
}

impl Drop for TestDbGuard {
    fn drop(&mut self) {
        let _ = Command::new("psql")
            .arg(&self.maintenance_url)
            .arg("-c")
            .arg(format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}' AND pid <> pg_backend_pid();",
                self.unique_db
            ))
            .status();
        let _ = Command::new("psql")
            .arg(&self.maintenance_url)
            .arg("-c")
            .arg(format!("DROP DATABASE IF EXISTS \"{}\"", self.unique_db))
            .status();
    }
}

fn with_database(url: &str, name: &str) -> String {
    let mut out = url.to_string();
    if let Some(idx) = out.rfind('/') {
        let query = url[idx + 1..].find('?').map(|q| url[idx + 1 + q..].to_string()).unwrap_or_default();
        out.replace_range(idx + 1.., &format!("{name}{query}"));
    }
    out
}

/// Creates a uniquely named database next to `test_db`, migrates it and
/// returns a pool on it. The guard drops the database.
pub async fn create_test_db_and_pool(test_db: &str) -> anyhow::Result<(PgPool, TestDbGuard)> {
    let maintenance_url = with_database(test_db, "postgres");
    let base_db_name = test_db
        .rsplit('/')
        .next()
        .and_then(|s| s.split('?').next())
        .unwrap_or("instaworld_test");
    let unique_db = format!("{}_{}", base_db_name, Uuid::new_v4().simple());

    let maint_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&maintenance_url)
        .await?;
    sqlx::query(&format!("CREATE DATABASE \"{}\"", unique_db))
        .execute(&maint_pool)
        .await?;
    maint_pool.close().await;

    let guard = TestDbGuard { maintenance_url, unique_db: unique_db.clone() };
    init_jwt_secret();
    let pool = db::init_db(&with_database(test_db, &unique_db), 5).await?;
    Ok((pool, guard))
}

/// Revocation store over a private in-memory cache.
pub fn in_memory_revocations() -> Revocations {
    Revocations::new(InMemoryCache::new(64).into_arc())
}

pub async fn spawn_app_with_plugins(plugins: Vec<Box<dyn Plugin>>) -> anyhow::Result<(String, tokio::task::JoinHandle<()>)> {
    let app = build_app(&plugins, None, in_memory_revocations()).await;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    Ok((format!("http://{}", addr), server_handle))
}

/// Inserts an activated user and returns its id with a bearer token.
pub async fn create_active_user(pool: &PgPool, username: &str) -> anyhow::Result<(Uuid, String)> {
    init_jwt_secret();
    let email = format!("{username}@example.com");
    let user = users_repo::insert_user(
        pool,
        NewUser {
            username,
            email: &email,
            password: "password123",
            first_name: "",
            last_name: "",
            phone_number: None,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("insert user: {}", e.message))?;
    users_repo::activate(pool, user.id)
        .await
        .map_err(|e| anyhow::anyhow!("activate user: {}", e.message))?;
    let token = token::issue(user.id).map_err(|e| anyhow::anyhow!("issue token: {}", e.message))?;
    Ok((user.id, token))
}

pub const TEST_UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

/// Every plugin the server mounts, over a shared pool and in-memory cache.
/// Returns the OTP notifier so tests can read issued codes.
pub fn full_plugin_set(
    pool: &PgPool,
    media_root: &std::path::Path,
) -> (Vec<Box<dyn Plugin>>, std::sync::Arc<CapturedCodes>) {
    use instaworld_api::plugins::auth::AuthPlugin;
    use instaworld_api::plugins::health::HealthPlugin;
    use instaworld_api::plugins::media::{LocalMediaStore, MediaPlugin};
    use instaworld_api::plugins::posts::PostsPlugin;
    use instaworld_api::plugins::social::{PgFollowGraph, SocialPlugin};
    use instaworld_api::plugins::stories::{PgStoryStore, StoriesPlugin, StoryLifecycle, SystemClock};
    use instaworld_api::plugins::users::UsersPlugin;
    use instaworld_api::plugins::users::otp::OtpService;
    use std::sync::Arc;

    let codes = Arc::new(CapturedCodes::default());
    let otp = OtpService::new(InMemoryCache::new(64).into_arc(), codes.clone());
    let media = LocalMediaStore::new(media_root).into_arc();
    let lifecycle = StoryLifecycle::new(
        Arc::new(PgStoryStore::new(pool.clone())),
        Arc::new(PgFollowGraph::new(pool.clone())),
        Arc::new(SystemClock),
        media.clone(),
    );

    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(HealthPlugin::new(pool.clone())),
        Box::new(AuthPlugin::new(pool.clone())),
        Box::new(UsersPlugin::new(pool.clone(), otp, media.clone(), TEST_UPLOAD_LIMIT)),
        Box::new(SocialPlugin::new(pool.clone())),
        Box::new(MediaPlugin::new(media.clone(), TEST_UPLOAD_LIMIT)),
        Box::new(PostsPlugin::new(pool.clone(), media, TEST_UPLOAD_LIMIT)),
        Box::new(StoriesPlugin::new(lifecycle, TEST_UPLOAD_LIMIT)),
    ];
    (plugins, codes)
}

/// Keeps the last one-time code sent to each address.
#[derive(Default)]
pub struct CapturedCodes {
    codes: parking_lot::Mutex<std::collections::HashMap<String, String>>,
}

impl CapturedCodes {
    pub fn code_for(&self, address: &str) -> Option<String> {
        self.codes.lock().get(address).cloned()
    }
}

#[async_trait::async_trait]
impl instaworld_api::plugins::users::otp::OtpNotifier for CapturedCodes {
    async fn send(
        &self,
        _channel: instaworld_api::plugins::users::otp::Channel,
        address: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        self.codes.lock().insert(address.to_string(), code.to_string());
        Ok(())
    }
}
