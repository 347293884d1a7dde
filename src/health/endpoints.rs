//! Liveness and readiness endpoints.
//!
//! These are the endpoints the gateway's own probes poll on upstream
//! services, so every service built on this crate answers them the same way.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

/// Body of `/healthz` and `/readyz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthStatus {
    pub fn healthy(service: &str, version: &str) -> Self {
        Self::with_status("healthy", service, version)
    }

    pub fn ready(service: &str, version: &str) -> Self {
        Self::with_status("ready", service, version)
    }

    fn with_status(status: &str, service: &str, version: &str) -> Self {
        Self {
            status: status.to_string(),
            service: service.to_string(),
            version: version.to_string(),
        }
    }
}

/// `GET /healthz`
pub async fn healthz(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(&state.service.name, &state.service.version))
}

/// `GET /readyz`
pub async fn readyz(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::ready(&state.service.name, &state.service.version))
}
