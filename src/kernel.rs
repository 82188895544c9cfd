use axum::{Extension, Router};
use axum::extract::Request;
use axum::middleware::{self, Next};
use async_trait::async_trait;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::plugins::auth::session::Revocations;
use crate::plugins::metrics::MetricsPlugin;

#[async_trait]
pub trait Plugin: Send + Sync {
    async fn router(&self) -> Router;

    fn name(&self) -> &'static str;
    /// Optional lifecycle hook called when the kernel starts.
    async fn on_start(&self) {}
    /// Optional lifecycle hook called on shutdown.
    async fn on_shutdown(&self) {}
}

/// Builds the application router by mounting each plugin under `/{plugin.name()}`.
///
/// With `metrics`, every plugin router is instrumented and its requests are
/// labelled with the plugin name. `revocations` is shared by every plugin
/// that authenticates requests.
pub async fn build_app(plugins: &[Box<dyn Plugin>], metrics: Option<MetricsPlugin>, revocations: Revocations) -> Router {
    let mut app = Router::new();

    for plugin in plugins.iter() {
        info!("starting plugin {}", plugin.name());
        plugin.on_start().await;
        let mut router = plugin.router().await;

        if let Some(m) = metrics.clone() {
            let label = plugin.name();
            router = router.layer(middleware::from_fn(move |req: Request, next: Next| {
                let m = m.clone();
                async move { m.track(label, req, next).await }
            }));
        }

        app = app.nest(&format!("/{}", plugin.name()), router);
    }

    app.layer(Extension(revocations))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
