/// Health check endpoints
///
/// # Endpoints
///
/// ```text
/// GET /        -> { "message": "TaskDesk API", "status": "running" }
/// GET /health  -> { "status": "healthy", "version": "0.1.0", "store": "postgres" }
/// ```
///
/// `/health` reports `degraded` when the store does not answer its ping.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Store adapter in use
    pub store: String,

    /// Store reachability
    pub store_status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
    pub status: String,
}

/// Service banner
pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "TaskDesk API".to_string(),
        status: "running".to_string(),
    })
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let store_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            "disconnected"
        }
    };

    Ok(Json(HealthResponse {
        status: if store_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.backend_name().to_string(),
        store_status: store_status.to_string(),
    }))
}
