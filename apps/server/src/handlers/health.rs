//! Liveness and database check. No authentication.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.db.health_check().await;

    if !healthy {
        warn!("Health check failed: database unreachable");
    }

    let (status, body) = if healthy {
        (StatusCode::OK, ("ok", "ok"))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ("degraded", "unreachable"))
    };

    (
        status,
        Json(HealthResponse {
            status: body.0,
            database: body.1,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
