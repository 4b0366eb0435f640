//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::ratelimit::RateLimiterStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StorageHealthResponse,
    pub queue: QueueHealthResponse,
    pub provider: ProviderHealthResponse,
    pub rate_limiter: RateLimiterStats,
}

#[derive(Debug, Serialize)]
pub struct StorageHealthResponse {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_connections: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueueHealthResponse {
    pub backend: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealthResponse {
    pub name: String,
    /// True when emails are logged instead of delivered
    pub simulated: bool,
}

/// GET /health - Reports "degraded" when the queue cannot be reached
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let depth = match state.queue.len().await {
        Ok(depth) => Some(depth),
        Err(e) => {
            tracing::warn!(error = %e, "Queue depth unavailable");
            None
        }
    };

    let storage = match state.postgres_pool {
        Some(ref pool) => StorageHealthResponse {
            backend: state.templates.backend_name().to_string(),
            pool_size: Some(pool.pool().size()),
            idle_connections: Some(pool.pool().num_idle()),
        },
        None => StorageHealthResponse {
            backend: state.templates.backend_name().to_string(),
            pool_size: None,
            idle_connections: None,
        },
    };

    let status = if depth.is_some() { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage,
        queue: QueueHealthResponse {
            backend: state.queue.backend_name().to_string(),
            connected: depth.is_some(),
            depth,
        },
        provider: ProviderHealthResponse {
            name: state.provider_name.to_string(),
            simulated: state.provider_simulated,
        },
        rate_limiter: state.rate_limiter.stats(),
    })
}
