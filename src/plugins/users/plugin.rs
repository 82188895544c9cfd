use axum::extract::DefaultBodyLimit;
use axum::{Router, routing::{post, get, put}};
use sqlx::PgPool;
use crate::kernel::Plugin;
use crate::plugins::media::store::DynMediaStore;
use crate::plugins::users::handlers::{self, UsersState};
use crate::plugins::users::otp::OtpService;

pub struct UsersPlugin {
    pub pool: PgPool,
    pub otp: OtpService,
    pub media: DynMediaStore,
    pub upload_limit: usize,
}

impl UsersPlugin {
    pub fn new(pool: PgPool, otp: OtpService, media: DynMediaStore, upload_limit: usize) -> Self {
        Self { pool, otp, media, upload_limit }
    }
}

#[async_trait::async_trait]
impl Plugin for UsersPlugin {
    async fn router(&self) -> Router {
        let state = UsersState { pool: self.pool.clone(), otp: self.otp.clone(), media: self.media.clone() };

        Router::new()
            .route("/", post(handlers::register))
            .route("/otp", post(handlers::request_activation))
            .route("/otp/verify", post(handlers::verify_activation))
            .route("/password/otp", post(handlers::request_password_reset))
            .route("/password/reset", post(handlers::reset_password))
            .route("/me", get(handlers::me).put(handlers::update_me).delete(handlers::delete_me))
            .route("/me/password", put(handlers::change_password))
            .route(
                "/me/image",
                put(handlers::upload_image).layer(DefaultBodyLimit::max(self.upload_limit)),
            )
            .route("/search", get(handlers::search))
            .route("/:id", get(handlers::profile))
            .with_state(state)
    }

    fn name(&self) -> &'static str {
        "users"
    }
}
