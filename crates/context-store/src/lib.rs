//! Keyed persistence for values that must outlive a single request.
//!
//! The place-order engine keeps one context per logical key here so an attempt
//! survives redirects to a payment provider and process restarts.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{ContextStoreError, Result};
pub use memory::InMemoryContextStore;
pub use postgres::PostgresContextStore;
pub use store::{ContextStore, Storable};
