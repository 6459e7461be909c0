//! HTTP route handlers.

pub mod carts;
pub mod ops;
pub mod payments;
pub mod placeorder;

use context_store::ContextStore;
use lock::Locker;
use ::placeorder::{Context, InMemoryCartService, InMemoryPaymentGateway, PlaceOrderHandler};

/// Shared application state accessible from all handlers.
///
/// Carts and payments are in-memory stand-ins for the shop's real systems;
/// the routes under `/carts` and `/payments` let a client play their part.
pub struct AppState<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    pub handler: PlaceOrderHandler<S, L>,
    pub carts: InMemoryCartService,
    pub gateway: InMemoryPaymentGateway,
    /// Name of the storage backend, reported by the health check.
    pub storage: &'static str,
}
