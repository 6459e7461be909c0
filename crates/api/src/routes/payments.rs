//! Payment provider callbacks for the in-memory gateway.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use context_store::ContextStore;
use lock::Locker;
use placeorder::{Context, FlowStatus, FlowStatusKind};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct FlowStatusRequest {
    /// One of `approved`, `completed`, `failed`, `canceled`, `aborted`, `waiting`.
    pub status: String,
    pub error: Option<String>,
}

impl FlowStatusRequest {
    fn into_status(self) -> Result<FlowStatus, ApiError> {
        let kind = match self.status.as_str() {
            "approved" => FlowStatusKind::Approved,
            "completed" => FlowStatusKind::Completed,
            "failed" => FlowStatusKind::Failed,
            "canceled" => FlowStatusKind::Canceled,
            "aborted" => FlowStatusKind::Aborted,
            "waiting" => FlowStatusKind::WaitingForCustomer,
            other => {
                return Err(ApiError::BadRequest(format!(
                    "Unknown payment status {other}"
                )));
            }
        };
        Ok(FlowStatus {
            error: self.error,
            ..FlowStatus::new(kind)
        })
    }
}

/// POST /payments/{correlation_id}/status: the provider reports a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(correlation_id): Path<String>,
    Json(req): Json<FlowStatusRequest>,
) -> Result<StatusCode, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    if !state.gateway.has_flow(&correlation_id) {
        return Err(ApiError::NotFound(format!(
            "Payment flow {correlation_id} not found"
        )));
    }
    let status = req.into_status()?;
    metrics::counter!("payment_callbacks_total").increment(1);
    tracing::info!(status = ?status.status, "payment status reported");
    state.gateway.set_flow_status(&correlation_id, status);
    Ok(StatusCode::NO_CONTENT)
}
