//! Order service trait and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use cart::{Cart, PlacedOrder};

use super::payment::Payment;
use crate::error::ServiceError;

/// Trait for creating and canceling orders.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Places the order(s) for a cart, paid by `payment` if any.
    async fn place_order(
        &self,
        cart: &Cart,
        payment: Option<&Payment>,
    ) -> Result<Vec<PlacedOrder>, ServiceError>;

    /// Cancels previously placed orders.
    async fn cancel_orders(&self, orders: &[PlacedOrder]) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    placed: Vec<(PlacedOrder, Option<Payment>)>,
    canceled: Vec<PlacedOrder>,
    fail_on_place: bool,
    fail_on_cancel: bool,
}

/// In-memory order service for testing.
///
/// The order number is the order id reserved on the cart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderService {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderService {
    /// Creates a new in-memory order service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on order placement.
    pub fn set_fail_on_place(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_place = fail;
    }

    /// Configures the service to fail on order cancellation.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_cancel = fail;
    }

    /// Orders placed so far, with the payment they were placed with.
    pub fn placed_orders(&self) -> Vec<(PlacedOrder, Option<Payment>)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .placed
            .clone()
    }

    /// Orders canceled so far.
    pub fn canceled_orders(&self) -> Vec<PlacedOrder> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .canceled
            .clone()
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn place_order(
        &self,
        cart: &Cart,
        payment: Option<&Payment>,
    ) -> Result<Vec<PlacedOrder>, ServiceError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_place {
            return Err(ServiceError::Order("order placement failed".to_string()));
        }
        let order_number = cart
            .reserved_order_id
            .clone()
            .ok_or_else(|| ServiceError::Order(format!("cart {} has no order id", cart.id)))?;

        let order = PlacedOrder { order_number };
        state.placed.push((order.clone(), payment.cloned()));
        Ok(vec![order])
    }

    async fn cancel_orders(&self, orders: &[PlacedOrder]) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_cancel {
            return Err(ServiceError::Order("order cancellation failed".to_string()));
        }
        state.canceled.extend_from_slice(orders);
        Ok(())
    }
}
