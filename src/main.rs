use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use instaworld_api::cache::{DynCache, InMemoryCache, RedisCache};
use instaworld_api::config::AppConfig;
use instaworld_api::db;
use instaworld_api::kernel::{build_app, Plugin};
use instaworld_api::plugins::auth::{AuthPlugin, Revocations};
use instaworld_api::plugins::health::HealthPlugin;
use instaworld_api::plugins::media::{LocalMediaStore, MediaPlugin};
use instaworld_api::plugins::metrics::MetricsPlugin;
use instaworld_api::plugins::posts::PostsPlugin;
use instaworld_api::plugins::social::{PgFollowGraph, SocialPlugin};
use instaworld_api::plugins::stories::{PgStoryStore, StoriesPlugin, StoryLifecycle, SystemClock};
use instaworld_api::plugins::users::UsersPlugin;
use instaworld_api::plugins::users::otp::{LogNotifier, OtpService};

async fn init_cache(config: &AppConfig) -> DynCache {
    if let Some(url) = config.redis_url.as_deref() {
        match RedisCache::new(url).await {
            Ok(cache) => {
                tracing::info!("using redis cache");
                return cache.into_arc();
            }
            Err(e) => tracing::warn!(error = %e, "redis unavailable, falling back to in-memory cache"),
        }
    }
    InMemoryCache::new(config.cache_capacity).into_arc()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::init_db(&config.database_url, config.db_max_connections).await?;

    let cache = init_cache(&config).await;
    let revocations = Revocations::new(cache.clone());
    let otp = OtpService::new(cache, Arc::new(LogNotifier));
    let media = LocalMediaStore::new(config.upload_dir.clone()).into_arc();
    let lifecycle = StoryLifecycle::new(
        Arc::new(PgStoryStore::new(pool.clone())),
        Arc::new(PgFollowGraph::new(pool.clone())),
        Arc::new(SystemClock),
        media.clone(),
    );
    let upload_limit = config.upload_max_bytes;

    let metrics_plugin = MetricsPlugin::new();
    let plugins_vec: Vec<Box<dyn Plugin>> = vec![
        Box::new(HealthPlugin::new(pool.clone())),
        Box::new(UsersPlugin::new(pool.clone(), otp, media.clone(), upload_limit)),
        Box::new(AuthPlugin::new(pool.clone())),
        Box::new(SocialPlugin::new(pool.clone())),
        Box::new(MediaPlugin::new(media.clone(), upload_limit)),
        Box::new(PostsPlugin::new(pool.clone(), media, upload_limit)),
        Box::new(StoriesPlugin::new(lifecycle, upload_limit)),
    ];

    let plugin_names: Vec<&'static str> = plugins_vec.iter().map(|p| p.name()).collect();
    tracing::info!("mounting plugins: {:?}", plugin_names);

    let mut app: Router = build_app(&plugins_vec, Some(metrics_plugin.clone()), revocations).await;

    // not instrumented, scrapes would count themselves
    app = app.nest("/metrics", metrics_plugin.router());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            for p in plugins_vec.iter() {
                p.on_shutdown().await;
            }
            tracing::info!("shutdown complete");
        })
        .await?;

    Ok(())
}
