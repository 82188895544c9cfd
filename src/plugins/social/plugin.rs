use axum::{Extension, Router, middleware, routing::{get, post}};
use sqlx::PgPool;

use crate::kernel::Plugin;
use crate::plugins::social::handlers::*;

pub struct SocialPlugin {
    pub pool: PgPool,
}

impl SocialPlugin {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Plugin for SocialPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/follow", post(toggle_follow))
            .route("/followers", get(followers))
            .route("/following", get(following))
            .layer(middleware::from_fn(crate::plugins::auth::middleware::require_auth))
            .layer(Extension(self.pool.clone()))
    }

    fn name(&self) -> &'static str {
        "social"
    }
}
