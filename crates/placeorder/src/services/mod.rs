//! External collaborators of the place-order states and in-memory
//! implementations of them.

pub mod cart;
pub mod order;
pub mod payment;

use std::sync::Arc;

pub use self::cart::{CartService, InMemoryCartService};
pub use self::order::{InMemoryOrderService, OrderService};
pub use self::payment::{
    FlowAction, FlowActionData, FlowResult, FlowStatus, FlowStatusKind, InMemoryPaymentGateway,
    Payment, PaymentGateway, PaymentGateways,
};

/// The collaborators injected into the state catalog.
#[derive(Clone)]
pub struct Services {
    pub carts: Arc<dyn CartService>,
    pub payments: Arc<PaymentGateways>,
    pub orders: Arc<dyn OrderService>,
}

impl Services {
    pub fn new(
        carts: Arc<dyn CartService>,
        payments: PaymentGateways,
        orders: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            carts,
            payments: Arc::new(payments),
            orders,
        }
    }
}
