use axum::{Router, routing::{delete, post, get}, middleware};
use crate::kernel::Plugin;
use async_trait::async_trait;
use sqlx::PgPool;
use crate::plugins::auth::handlers;

pub struct AuthPlugin {
    pool: PgPool,
}

impl AuthPlugin {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl Plugin for AuthPlugin {
    async fn router(&self) -> Router {
        let public = Router::new()
            .route("/login", post(handlers::login));

        let protected = Router::new()
            .route("/whoami", get(handlers::whoami))
            .route("/refresh", post(handlers::refresh))
            .route("/logout", delete(handlers::logout))
            .layer(middleware::from_fn(crate::plugins::auth::middleware::require_auth));

        public.merge(protected).with_state(self.pool.clone())
    }

    fn name(&self) -> &'static str { "auth" }
}
