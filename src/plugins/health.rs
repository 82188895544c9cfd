use crate::kernel::Plugin;
use axum::{Extension, Json, Router, routing::get};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
}

pub struct HealthPlugin {
    pool: PgPool,
}

impl HealthPlugin {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::debug_handler]
async fn health_handler(Extension(pool): Extension<PgPool>) -> Json<Health> {
    let database = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            "unavailable"
        }
    };
    let status = if database == "ok" { "ok" } else { "degraded" };
    Json(Health { status, database })
}

#[async_trait::async_trait]
impl Plugin for HealthPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", get(health_handler))
            .layer(Extension(self.pool.clone()))
    }

    fn name(&self) -> &'static str {
        "health"
    }

    async fn on_start(&self) {
        tracing::info!("health plugin started");
    }
}
