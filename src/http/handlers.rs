//! Gateway query endpoints.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::routing::{AggregateHealth, RouteListing};

/// One key of the metric sink snapshot.
#[derive(Debug, Serialize)]
pub struct StatsEntry {
    pub route: String,
    pub status: &'static str,
    pub count: u64,
    pub mean_ms: f64,
    pub buckets: Vec<u64>,
}

/// `GET /routes`
pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteListing>> {
    Json(state.gateway.listing())
}

/// `GET /status`
///
/// Always 200; degradation is reported in the body.
pub async fn aggregate_status(State(state): State<AppState>) -> Json<AggregateHealth> {
    let health = state.gateway.aggregate_health(state.probe_timeout).await;
    let unreachable: Vec<_> = health.unreachable().map(|v| v.service_name.as_str()).collect();
    if !unreachable.is_empty() {
        tracing::warn!(
            unreachable = ?unreachable,
            "Aggregate health degraded"
        );
    }
    Json(health)
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<Vec<StatsEntry>> {
    let entries = state
        .sink
        .snapshot()
        .into_iter()
        .map(|(key, stats)| StatsEntry {
            route: key.route_label,
            status: key.status.as_str(),
            count: stats.count,
            mean_ms: stats.mean().as_secs_f64() * 1000.0,
            buckets: stats.buckets,
        })
        .collect();
    Json(entries)
}

/// Fallback for paths with no local handler.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "not_found",
            "path": uri.path(),
        })),
    )
}
