//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub database: &'static str,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Reports 503 while the database is unreachable
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    if !connected {
        tracing::warn!("Health check: database unreachable");
    }

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if connected { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            environment: state.config.environment.clone(),
            database: if connected { "connected" } else { "disconnected" },
            pool_size: state.db.size(),
            idle_connections: state.db.num_idle(),
        }),
    )
}
