//! Order placement.

use async_trait::async_trait;
use cart::CartStatus;

use crate::context::RollbackData;
use crate::error::CompensationError;
use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::{FlowStatusKind, Services};
use crate::state::StateName;

use super::{RunResult, State, payment_flow, unexpected};

/// Places the order(s) for the cart.
///
/// Runs after the payment completed, before it completed when the gateway
/// asked for early placement, or for a free cart once it was completed.
pub(super) struct PlaceOrder {
    services: Services,
}

impl PlaceOrder {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }

    async fn next_state(&self, process: &Process) -> Result<StateName, FailedReason> {
        if process.context().cart().status == CartStatus::Completed {
            return Ok(StateName::Success);
        }

        let gateway = payment_flow::selected_gateway(process, &self.services)
            .map_err(|e| FailedReason::payment(e.to_string()))?;
        let status = gateway
            .flow_status(
                process.context().cart(),
                &payment_flow::correlation_id(process),
            )
            .await
            .map_err(|e| FailedReason::payment(e.to_string()))?;

        Ok(if status.status == FlowStatusKind::Completed {
            StateName::CompleteCart
        } else {
            StateName::CloseCart
        })
    }
}

#[async_trait]
impl State for PlaceOrder {
    fn name(&self) -> StateName {
        StateName::PlaceOrder
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let payment = match payment_flow::order_payment(process, &self.services).await {
            Ok(payment) => payment,
            Err(e) => return RunResult::failed(FailedReason::payment(e.to_string())),
        };

        let placed = self
            .services
            .orders
            .place_order(process.context().cart(), payment.as_ref())
            .await;
        let orders = match placed {
            Ok(orders) => orders,
            Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
        };

        let mut cart = process.context().cart().clone();
        cart.placed_orders.extend(orders.iter().cloned());
        process.update_cart(cart);

        let result = RunResult::with_rollback(RollbackData::OrdersPlaced { orders });
        match self.next_state(process).await {
            Ok(next) => {
                process.update_state(next, None);
                result
            }
            Err(reason) => result.and_failed(reason),
        }
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), CompensationError> {
        let RollbackData::OrdersPlaced { orders } = data else {
            return Err(unexpected(self.name(), data));
        };
        self.services.orders.cancel_orders(orders).await?;
        Ok(())
    }
}
