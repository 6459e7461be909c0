//! States changing the lifecycle status of the cart.

use async_trait::async_trait;

use crate::context::RollbackData;
use crate::error::CompensationError;
use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::Services;
use crate::state::StateName;

use super::{RunResult, State, payment_flow, unexpected};

async fn restore(
    services: &Services,
    state: StateName,
    data: &RollbackData,
) -> Result<(), CompensationError> {
    let RollbackData::CartRestore { cart } = data else {
        return Err(unexpected(state, data));
    };
    services.carts.restore_cart(cart).await?;
    Ok(())
}

/// Completes the cart so the customer starts over with a new one.
pub(super) struct CompleteCart {
    services: Services,
}

impl CompleteCart {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for CompleteCart {
    fn name(&self) -> StateName {
        StateName::CompleteCart
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let before = process.context().cart().clone();
        let cart = match self.services.carts.complete_cart(&before).await {
            Ok(cart) => cart,
            Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
        };
        process.update_cart(cart);
        let result = RunResult::with_rollback(RollbackData::CartRestore { cart: before });

        if !process.context().cart().is_order_placed() {
            process.update_state(StateName::PlaceOrder, None);
            return result;
        }

        match payment_flow::confirm_payment(process, &self.services).await {
            Ok(()) => {
                process.update_state(StateName::Success, None);
                result
            }
            Err(e) => result.and_failed(FailedReason::payment(e.to_string())),
        }
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), CompensationError> {
        restore(&self.services, self.name(), data).await
    }
}

/// Closes the cart against changes while an early placed order awaits its
/// payment.
pub(super) struct CloseCart {
    services: Services,
}

impl CloseCart {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for CloseCart {
    fn name(&self) -> StateName {
        StateName::CloseCart
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let before = process.context().cart().clone();
        let cart = match self.services.carts.close_cart(&before).await {
            Ok(cart) => cart,
            Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
        };
        process.update_cart(cart);
        process.update_state(StateName::ValidatePayment, None);
        RunResult::with_rollback(RollbackData::CartRestore { cart: before })
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), CompensationError> {
        restore(&self.services, self.name(), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, paid_cart};
    use cart::{Cart, CartItem, CartStatus, Money, PlacedOrder};

    #[tokio::test]
    async fn test_complete_free_cart_moves_to_place_order() {
        let fixture = Fixture::new();
        let gift = Cart::new("gift").with_item(CartItem::new("SKU-GIFT", "Gift", 1, Money::zero()));
        let mut process = fixture.process(gift.clone());

        let result = CompleteCart::new(fixture.services()).run(&mut process).await;

        assert_eq!(
            result.rollback_data,
            Some(RollbackData::CartRestore { cart: gift })
        );
        assert_eq!(process.context().cart().status, CartStatus::Completed);
        assert_eq!(process.context().current_state_name(), StateName::PlaceOrder);
    }

    #[tokio::test]
    async fn test_complete_cart_confirms_payment_of_placed_order() {
        let fixture = Fixture::new();
        let mut cart = paid_cart("completed");
        cart.placed_orders.push(PlacedOrder {
            order_number: "ORD-0001".to_string(),
        });
        let mut process = fixture.process(cart);
        fixture.start_flow(&process).await;

        CompleteCart::new(fixture.services()).run(&mut process).await;

        assert_eq!(process.context().current_state_name(), StateName::Success);
        assert!(
            fixture
                .gateway
                .is_confirmed(&process.context().uuid().correlation_id())
        );
    }

    #[tokio::test]
    async fn test_close_cart_and_restore() {
        let fixture = Fixture::new();
        let mut process = fixture.process(paid_cart("completed"));
        let state = CloseCart::new(fixture.services());

        let result = state.run(&mut process).await;
        assert_eq!(process.context().cart().status, CartStatus::Closed);
        assert_eq!(
            process.context().current_state_name(),
            StateName::ValidatePayment
        );

        state.rollback(&result.rollback_data.unwrap()).await.unwrap();
        assert_eq!(
            fixture.carts.cart("cart-1").map(|c| c.status),
            Some(CartStatus::Open)
        );
    }

    #[tokio::test]
    async fn test_restore_failure_is_reported() {
        let fixture = Fixture::new();
        fixture.carts.set_fail_on_restore(true);
        let err = CompleteCart::new(fixture.services())
            .rollback(&RollbackData::CartRestore {
                cart: paid_cart("completed"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CompensationError::Service(_)));
    }
}
