//! Health check HTTP endpoint for monitoring

use crate::metrics;
use crate::state::PositionState;
use crate::strategy::StrategyResult;
use crate::types::AppEnv;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Clone)]
pub struct HealthResponse {
    /// "starting", "healthy" (last cycle had valid data) or "degraded"
    pub status: String,
    pub version: String,
    pub mode: String,
    pub position_state: PositionState,
    pub last_signal: Option<String>,
    pub last_z_score: Option<f64>,
    pub cycles: u64,
    pub uptime_seconds: u64,
    pub timestamp: i64,
}

impl HealthResponse {
    fn new(env: AppEnv) -> Self {
        Self {
            status: "starting".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: env.to_string(),
            position_state: PositionState::Flat,
            last_signal: None,
            last_z_score: None,
            cycles: 0,
            uptime_seconds: 0,
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Shared snapshot written by the engine after every cycle.
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthResponse>>,
    started: Instant,
}

impl HealthState {
    pub fn new(env: AppEnv) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthResponse::new(env))),
            started: Instant::now(),
        }
    }

    /// Record the outcome of a finished cycle.
    pub async fn record_cycle(
        &self,
        cycle: u64,
        state: PositionState,
        result: Option<&StrategyResult>,
    ) {
        let mut health = self.inner.write().await;
        health.cycles = cycle;
        health.position_state = state;
        health.uptime_seconds = self.started.elapsed().as_secs();
        health.timestamp = Utc::now().timestamp();

        match result {
            Some(r) if r.is_data_valid => {
                health.status = "healthy".to_string();
                health.last_signal = Some(r.signal.to_string());
                if r.z_score.is_some() {
                    health.last_z_score = r.z_score;
                }
            }
            _ => health.status = "degraded".to_string(),
        }
    }

    pub async fn snapshot(&self) -> HealthResponse {
        let mut health = self.inner.read().await.clone();
        health.uptime_seconds = self.started.elapsed().as_secs();
        health
    }
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> Json<HealthResponse> {
    Json(state.snapshot().await)
}

async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

pub async fn run_health_server(port: u16, state: HealthState) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Health check server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Health server failed to bind to {}: {}. System will continue without health endpoint.", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!("Health check server failed: {}", e);
    }
}
