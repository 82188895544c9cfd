use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware, routing::delete, routing::get, Extension};
use crate::kernel::Plugin;
use crate::plugins::stories::handlers::*;
use crate::plugins::stories::lifecycle::StoryLifecycle;
use crate::plugins::stories::store::SweepScope;

pub struct StoriesPlugin {
    pub lifecycle: StoryLifecycle,
    /// Largest accepted request body, uploads included.
    pub upload_limit: usize,
}

impl StoriesPlugin {
    pub fn new(lifecycle: StoryLifecycle, upload_limit: usize) -> Self {
        Self { lifecycle, upload_limit }
    }
}

#[async_trait::async_trait]
impl Plugin for StoriesPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", get(list_feed).post(create_story))
            .route("/archive", get(list_archive))
            .route("/highlights", get(list_highlights).patch(toggle_highlight))
            .route("/:id", delete(delete_story))
            .layer(middleware::from_fn(crate::plugins::auth::middleware::require_auth))
            .layer(Extension(self.lifecycle.clone()))
            .layer(DefaultBodyLimit::max(self.upload_limit))
    }

    fn name(&self) -> &'static str { "stories" }

    async fn on_start(&self) {
        match self.lifecycle.sweep_expired_stories(SweepScope::All).await {
            Ok(archived) => tracing::info!(archived, "startup story sweep finished"),
            Err(e) => tracing::warn!(error = %e, "startup story sweep failed"),
        }
    }
}
