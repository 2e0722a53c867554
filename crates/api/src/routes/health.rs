//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::store::PartyStore;
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub retirement_sweep: RetirementHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Retirement sweep settings in effect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RetirementHealth {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub grace_hours: i64,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check: storage round trip plus sweep settings.
pub async fn health_check<S: PartyStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let ping = state.store.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Err(err) = &ping {
        tracing::warn!(error = %err, "Health check could not reach the database");
    }
    let connected = ping.is_ok();

    let retirement = &state.config.retirement;
    let response = HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected,
            latency_ms: connected.then_some(latency_ms),
        },
        retirement_sweep: RetirementHealth {
            enabled: retirement.enabled,
            interval_minutes: retirement.interval_minutes,
            grace_hours: retirement.grace_hours,
        },
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe: the process is up.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe: the database answers.
pub async fn ready<S: PartyStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    state
        .store
        .ping()
        .await
        .map(|_| {
            Json(StatusResponse {
                status: "ready".to_string(),
            })
        })
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}
