//! States talking to the payment gateway.

use async_trait::async_trait;
use tracing::debug;

use crate::context::RollbackData;
use crate::error::CompensationError;
use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::Services;
use crate::state::StateName;

use super::{RunResult, State, payment_flow, unexpected};

/// Starts the payment flow with the selected gateway.
pub(super) struct CreatePayment {
    services: Services,
}

impl CreatePayment {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for CreatePayment {
    fn name(&self) -> StateName {
        StateName::CreatePayment
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let gateway = match payment_flow::selected_gateway(process, &self.services) {
            Ok(gateway) => gateway,
            Err(e) => return RunResult::failed(FailedReason::payment(e.to_string())),
        };
        let ctx = process.context();
        let correlation_id = payment_flow::correlation_id(process);
        let code = ctx
            .cart()
            .payment_selection
            .as_ref()
            .map(|s| s.gateway.clone())
            .unwrap_or_default();

        // Recorded even when starting fails: the gateway may hold a flow anyway.
        let rollback = RunResult::with_rollback(RollbackData::PaymentCreated {
            gateway: code,
            correlation_id: correlation_id.clone(),
        });

        let started = gateway
            .start_flow(ctx.cart(), &correlation_id, ctx.return_url())
            .await;
        match started {
            Ok(flow) => {
                let next = if flow.early_place_order {
                    StateName::PlaceOrder
                } else {
                    StateName::ValidatePayment
                };
                process.update_state(next, None);
                rollback
            }
            Err(e) => rollback.and_failed(FailedReason::payment(e.to_string())),
        }
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), CompensationError> {
        let RollbackData::PaymentCreated {
            gateway,
            correlation_id,
        } = data
        else {
            return Err(unexpected(self.name(), data));
        };

        let gateway = self.services.payments.gateway(gateway)?;
        let payment = gateway.order_payment_from_flow(correlation_id).await?;
        gateway.cancel_order_payment(&payment).await?;
        debug!(correlation_id = %correlation_id, "Payment canceled");
        Ok(())
    }
}

/// Checks on the payment flow and follows its status.
pub(super) struct ValidatePayment {
    services: Services,
}

impl ValidatePayment {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for ValidatePayment {
    fn name(&self) -> StateName {
        StateName::ValidatePayment
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        payment_flow::check(process, &self.services).await
    }
}

/// Completes an approved payment.
pub(super) struct CompletePayment {
    services: Services,
}

impl CompletePayment {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for CompletePayment {
    fn name(&self) -> StateName {
        StateName::CompletePayment
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let completed = match payment_flow::selected_gateway(process, &self.services) {
            Ok(gateway) => {
                gateway
                    .complete_flow(
                        process.context().cart(),
                        &payment_flow::correlation_id(process),
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        match completed {
            Ok(()) => {
                process.update_state(StateName::ValidatePayment, None);
                RunResult::proceed()
            }
            Err(e) => RunResult::failed(FailedReason::payment(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{FlowStatus, FlowStatusKind};
    use crate::testing::{Fixture, paid_cart};
    use cart::{Money, PaymentSelection};

    #[tokio::test]
    async fn test_create_payment_records_rollback_even_on_failure() {
        let fixture = Fixture::new();
        let mut cart = paid_cart("completed");
        cart.payment_selection = Some(PaymentSelection::new(
            "offline",
            "bitcoin",
            Money::from_cents(1000),
        ));
        let mut process = fixture.process(cart);

        let result = CreatePayment::new(fixture.services())
            .run(&mut process)
            .await;

        assert!(matches!(
            result.rollback_data,
            Some(RollbackData::PaymentCreated { .. })
        ));
        assert!(matches!(result.failed, Some(FailedReason::PaymentError { .. })));
    }

    #[tokio::test]
    async fn test_create_payment_unknown_gateway_fails_without_rollback() {
        let fixture = Fixture::new();
        let mut cart = paid_cart("completed");
        cart.payment_selection = Some(PaymentSelection::new(
            "paypal",
            "completed",
            Money::from_cents(1000),
        ));
        let mut process = fixture.process(cart);

        let result = CreatePayment::new(fixture.services())
            .run(&mut process)
            .await;
        assert_eq!(result.rollback_data, None);
        assert_eq!(
            result.failed,
            Some(FailedReason::payment("Unknown payment gateway: paypal"))
        );
    }

    #[tokio::test]
    async fn test_early_place_order() {
        let fixture = Fixture::new();
        fixture.gateway.set_early_place_order("invoice");
        fixture
            .gateway
            .set_method_status("invoice", FlowStatus::new(FlowStatusKind::WaitingForCustomer));
        let mut process = fixture.process(paid_cart("invoice"));

        CreatePayment::new(fixture.services())
            .run(&mut process)
            .await;
        assert_eq!(process.context().current_state_name(), StateName::PlaceOrder);
    }

    #[tokio::test]
    async fn test_complete_payment_moves_back_to_validation() {
        let fixture = Fixture::new();
        let mut process = fixture.process(paid_cart("approved"));
        let create = CreatePayment::new(fixture.services());
        create.run(&mut process).await;

        let result = CompletePayment::new(fixture.services())
            .run(&mut process)
            .await;
        assert_eq!(result, RunResult::proceed());
        assert_eq!(
            process.context().current_state_name(),
            StateName::ValidatePayment
        );

        ValidatePayment::new(fixture.services())
            .run(&mut process)
            .await;
        assert_eq!(process.context().current_state_name(), StateName::PlaceOrder);
    }

    #[tokio::test]
    async fn test_rollback_cancels_the_flow_payment() {
        let fixture = Fixture::new();
        let mut process = fixture.process(paid_cart("completed"));
        let state = CreatePayment::new(fixture.services());
        let result = state.run(&mut process).await;

        state
            .rollback(&result.rollback_data.unwrap())
            .await
            .unwrap();
        assert_eq!(
            fixture.gateway.canceled_payments(),
            vec![process.context().uuid().correlation_id()]
        );

        let err = state
            .rollback(&RollbackData::OrdersPlaced { orders: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, CompensationError::UnexpectedData { .. }));
    }
}
