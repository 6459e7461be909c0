//! HTTP API server with observability for the place-order engine.
//!
//! Exposes the place-order commands per cart key, with structured logging
//! (tracing) and Prometheus metrics. Carts and the payment gateway are
//! in-memory, so the whole flow can be driven over HTTP.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use context_store::ContextStore;
use lock::Locker;
use metrics_exporter_prometheus::PrometheusHandle;
use placeorder::{
    Context, Coordinator, InMemoryCartService, InMemoryOrderService, InMemoryPaymentGateway,
    PaymentGateways, PlaceOrderConfig, PlaceOrderHandler, ProcessFactory, Services, StateCatalog,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Code of the in-memory payment gateway.
pub const OFFLINE_GATEWAY: &str = "offline";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L>(state: Arc<AppState<S, L>>, metrics_handle: PrometheusHandle) -> Router
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<S, L>))
        .route(
            "/carts/{key}",
            put(routes::carts::put::<S, L>).get(routes::carts::get::<S, L>),
        )
        .route(
            "/payments/{correlation_id}/status",
            post(routes::payments::update_status::<S, L>),
        )
        .route(
            "/placeorder/{key}",
            post(routes::placeorder::start::<S, L>)
                .get(routes::placeorder::current::<S, L>)
                .delete(routes::placeorder::clear::<S, L>),
        )
        .route(
            "/placeorder/{key}/refresh",
            post(routes::placeorder::refresh::<S, L>),
        )
        .route(
            "/placeorder/{key}/refresh-blocking",
            post(routes::placeorder::refresh_blocking::<S, L>),
        )
        .route(
            "/placeorder/{key}/cancel",
            post(routes::placeorder::cancel::<S, L>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around the given store and locker, with
/// in-memory carts, orders and payment gateway.
pub fn create_default_state<S, L>(
    store: S,
    locker: L,
    config: PlaceOrderConfig,
    storage: &'static str,
) -> Arc<AppState<S, L>>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let carts = InMemoryCartService::new();
    let gateway = InMemoryPaymentGateway::new(OFFLINE_GATEWAY);
    let orders = InMemoryOrderService::new();

    let services = Services::new(
        Arc::new(carts.clone()),
        PaymentGateways::new().with_gateway(OFFLINE_GATEWAY, Arc::new(gateway.clone())),
        Arc::new(orders),
    );
    let factory = ProcessFactory::new(StateCatalog::new(services));
    let coordinator = Arc::new(Coordinator::new(store, locker, factory, config));
    let handler = PlaceOrderHandler::new(coordinator, Arc::new(carts.clone()));

    Arc::new(AppState {
        handler,
        carts,
        gateway,
        storage,
    })
}
