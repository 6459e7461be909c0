//! API server entry point.

use context_store::{ContextStore, InMemoryContextStore, PostgresContextStore};
use lock::{InMemoryLocker, Locker, PostgresLocker};
use metrics_exporter_prometheus::PrometheusHandle;
use placeorder::{Context, PlaceOrderConfig};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, L>(
    config: &Config,
    store: S,
    locker: L,
    engine: PlaceOrderConfig,
    storage: &'static str,
    metrics_handle: PrometheusHandle,
) where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let state = api::create_default_state(store, locker, engine, storage);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, storage, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick storage and serve
    let engine = PlaceOrderConfig::from_env();
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresContextStore::new(pool.clone(), engine.context_ttl);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let locker = PostgresLocker::new(pool);
            serve(&config, store, locker, engine, "postgres", metrics_handle).await;
        }
        None => {
            let store = InMemoryContextStore::<Context>::new();
            serve(
                &config,
                store,
                InMemoryLocker::new(),
                engine,
                "memory",
                metrics_handle,
            )
            .await;
        }
    }

    tracing::info!("server shut down gracefully");
}
