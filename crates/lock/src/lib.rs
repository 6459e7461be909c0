//! Keyed mutual exclusion with bounded leases.
//!
//! A [`Locker`] hands out at most one [`LockGuard`] per key. Two
//! implementations are provided: [`InMemoryLocker`] for a single process and
//! [`PostgresLocker`] for a cluster sharing one database.

pub mod error;
pub mod locker;
pub mod memory;
pub mod postgres;

pub use error::{LockError, Result};
pub use locker::{LockGuard, Locker, Release};
pub use memory::InMemoryLocker;
pub use postgres::PostgresLocker;
