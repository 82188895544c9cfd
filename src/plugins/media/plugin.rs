use axum::extract::DefaultBodyLimit;
use axum::{Extension, Router, routing::post};
use tower_http::services::ServeDir;

use crate::kernel::Plugin;
use crate::plugins::media::handlers::upload_files;
use crate::plugins::media::store::DynMediaStore;

pub struct MediaPlugin {
    store: DynMediaStore,
    upload_limit: usize,
}

impl MediaPlugin {
    pub fn new(store: DynMediaStore, upload_limit: usize) -> Self {
        Self { store, upload_limit }
    }
}

#[async_trait::async_trait]
impl Plugin for MediaPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/upload", post(upload_files).layer(DefaultBodyLimit::max(self.upload_limit)))
            .nest_service("/files", ServeDir::new(self.store.root()))
            .layer(Extension(self.store.clone()))
    }

    fn name(&self) -> &'static str {
        "media"
    }
}
