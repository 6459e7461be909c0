//! PostgreSQL lock integration tests
//!
//! These tests need Docker and share one PostgreSQL container.
//! Run with:
//!
//! ```bash
//! cargo test -p lock --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use lock::{Locker, PostgresLocker};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_placeorder_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_locker() -> PostgresLocker {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE placeorder_locks")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLocker::new(pool)
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_lock_is_exclusive_until_unlocked() {
    let locker = get_test_locker().await;

    let guard = locker
        .try_lock("cart-1", Duration::from_secs(30))
        .await
        .unwrap();
    let err = locker
        .try_lock("cart-1", Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(err.is_taken());

    guard.unlock().await.unwrap();
    let again = locker
        .try_lock("cart-1", Duration::from_secs(30))
        .await
        .unwrap();
    again.unlock().await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_held_lease_is_extended_past_its_duration() {
    let locker = get_test_locker().await;
    let lease = Duration::from_millis(600);

    let guard = locker.try_lock("cart-1", lease).await.unwrap();
    tokio::time::sleep(lease * 3).await;

    // Still held because the guard keeps extending it.
    let err = locker.try_lock("cart-1", lease).await.unwrap_err();
    assert!(err.is_taken());

    guard.unlock().await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_dropped_guard_expires() {
    let locker = get_test_locker().await;
    let lease = Duration::from_millis(300);

    drop(locker.try_lock("cart-1", lease).await.unwrap());
    tokio::time::sleep(lease * 2).await;

    let guard = locker.try_lock("cart-1", lease).await.unwrap();
    guard.unlock().await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_guard_reports_lease_taken_from_it() {
    let locker = get_test_locker().await;
    let lease = Duration::from_millis(300);

    let guard = locker.try_lock("cart-1", lease).await.unwrap();
    assert!(!guard.is_lost());

    sqlx::query("DELETE FROM placeorder_locks WHERE lock_key = $1")
        .bind("cart-1")
        .execute(locker.pool())
        .await
        .unwrap();
    tokio::time::sleep(lease).await;

    assert!(guard.is_lost());
    guard.unlock().await.unwrap();
}
