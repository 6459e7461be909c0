//! Place-order command endpoints.
//!
//! The path key identifies the customer's cart; at most one attempt exists
//! per key.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProcessId;
use context_store::ContextStore;
use lock::Locker;
use placeorder::{Context, PlaceOrderInfo};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct StartRequest {
    /// Where the payment provider sends the customer back to.
    pub return_url: String,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub uuid: ProcessId,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub canceled: bool,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// POST /placeorder/{key}: starts placing the cart of `key`.
#[tracing::instrument(skip(state, req))]
pub async fn start<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
    Json(req): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    if req.return_url.trim().is_empty() {
        return Err(ApiError::BadRequest("return_url is required".to_string()));
    }
    let uuid = state
        .handler
        .start_place_order(&key, &req.return_url)
        .await?;
    Ok((StatusCode::CREATED, Json(StartResponse { uuid })))
}

/// GET /placeorder/{key}
pub async fn current<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<PlaceOrderInfo>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    Ok(Json(state.handler.current(&key).await?))
}

/// POST /placeorder/{key}/refresh: advances by one state.
#[tracing::instrument(skip(state))]
pub async fn refresh<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<PlaceOrderInfo>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    Ok(Json(state.handler.refresh(&key).await?))
}

/// POST /placeorder/{key}/refresh-blocking: advances until the process
/// settles.
#[tracing::instrument(skip(state))]
pub async fn refresh_blocking<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<PlaceOrderInfo>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    Ok(Json(state.handler.refresh_blocking(&key).await?))
}

/// POST /placeorder/{key}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<CancelResponse>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let canceled = state.handler.cancel(&key).await?;
    Ok(Json(CancelResponse { canceled }))
}

/// DELETE /placeorder/{key}
#[tracing::instrument(skip(state))]
pub async fn clear<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<ClearResponse>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let cleared = state.handler.clear(&key).await?;
    Ok(Json(ClearResponse { cleared }))
}
