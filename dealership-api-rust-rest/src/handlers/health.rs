use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;

use crate::constants::API_NAME;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the router state was built.
    pub uptime: f64,
    pub version: &'static str,
    pub storage: StorageCheck,
}

#[derive(Debug, Serialize)]
pub struct StorageCheck {
    pub backend: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = match state.storage.ping().await {
        Ok(()) => StorageCheck {
            backend: state.storage.backend_name(),
            status: "healthy",
            message: None,
        },
        Err(e) => {
            tracing::error!("{} Health check storage ping failed: {}", API_NAME, e);
            StorageCheck {
                backend: state.storage.backend_name(),
                status: "unhealthy",
                message: Some("Storage backend unreachable".to_string()),
            }
        }
    };

    let healthy = storage.status == "healthy";
    let response = HealthResponse {
        status: if healthy { "OK" } else { "DEGRADED" },
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION"),
        storage,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response))
}
