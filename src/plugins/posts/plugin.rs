use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware, routing::{get, post}};
use sqlx::PgPool;

use crate::kernel::Plugin;
use crate::plugins::media::store::DynMediaStore;
use crate::plugins::posts::handlers::{self, PostsState};

pub struct PostsPlugin {
    pub pool: PgPool,
    pub media: DynMediaStore,
    pub upload_limit: usize,
}

impl PostsPlugin {
    pub fn new(pool: PgPool, media: DynMediaStore, upload_limit: usize) -> Self {
        Self { pool, media, upload_limit }
    }
}

#[async_trait::async_trait]
impl Plugin for PostsPlugin {
    async fn router(&self) -> Router {
        let state = PostsState { pool: self.pool.clone(), media: self.media.clone() };

        Router::new()
            .route(
                "/",
                get(handlers::list_by_owner)
                    .post(handlers::create_post)
                    .layer(DefaultBodyLimit::max(self.upload_limit)),
            )
            .route("/all", get(handlers::list_all))
            .route("/feed", get(handlers::feed))
            .route("/explore", get(handlers::explore))
            .route("/liked", get(handlers::liked))
            .route("/saved", get(handlers::saved))
            .route("/user/:user_id", get(handlers::list_for_user))
            .route(
                "/:id",
                get(handlers::get_post).put(handlers::update_post).delete(handlers::delete_post),
            )
            .route("/:id/like", post(handlers::toggle_like))
            .route("/:id/save", post(handlers::toggle_save))
            .route("/:id/comments", get(handlers::list_comments).post(handlers::add_comment))
            .layer(middleware::from_fn(crate::plugins::auth::middleware::require_auth))
            .with_state(state)
    }

    fn name(&self) -> &'static str {
        "posts"
    }
}
