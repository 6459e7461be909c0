//! Health check and Prometheus metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use context_store::ContextStore;
use lock::Locker;
use metrics_exporter_prometheus::PrometheusHandle;
use placeorder::Context;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health
pub async fn health<S, L>(State(state): State<Arc<AppState<S, L>>>) -> Json<HealthResponse>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    Json(HealthResponse {
        status: "ok",
        storage: state.storage,
    })
}

/// GET /metrics in the Prometheus text format.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
