//! States waiting for the customer or the payment provider.

use async_trait::async_trait;

use crate::process::Process;
use crate::services::Services;
use crate::state::StateName;

use super::{RunResult, State, payment_flow};

/// The caller presents the state data; the next run re-validates the payment.
pub(super) struct Presentation {
    name: StateName,
}

impl Presentation {
    pub(super) fn new(name: StateName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl State for Presentation {
    fn name(&self) -> StateName {
        self.name
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        process.update_state(StateName::ValidatePayment, None);
        RunResult::proceed()
    }
}

/// Checks on the payment flow directly on every run.
pub(super) struct AwaitCustomer {
    name: StateName,
    services: Services,
}

impl AwaitCustomer {
    pub(super) fn new(name: StateName, services: Services) -> Self {
        Self { name, services }
    }
}

#[async_trait]
impl State for AwaitCustomer {
    fn name(&self) -> StateName {
        self.name
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        payment_flow::check(process, &self.services).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{FlowAction, FlowActionData, FlowStatus};
    use crate::testing::{Fixture, paid_cart};

    #[tokio::test]
    async fn test_presentation_returns_to_payment_validation() {
        let fixture = Fixture::new();
        let mut process = fixture.process(paid_cart("redirect"));
        process.update_state(StateName::Redirect, None);

        Presentation::new(StateName::Redirect)
            .run(&mut process)
            .await;
        assert_eq!(
            process.context().current_state_name(),
            StateName::ValidatePayment
        );
    }

    #[tokio::test]
    async fn test_await_customer_stays_while_flow_waits() {
        let fixture = Fixture::new();
        fixture.gateway.set_method_status(
            "qr",
            FlowStatus::unapproved(FlowAction::WaitForCustomer, FlowActionData::default()),
        );
        let mut process = fixture.process(paid_cart("qr"));
        fixture.start_flow(&process).await;
        process.update_state(StateName::WaitForCustomer, None);

        let state = AwaitCustomer::new(StateName::WaitForCustomer, fixture.services());
        state.run(&mut process).await;
        assert_eq!(
            process.context().current_state_name(),
            StateName::WaitForCustomer
        );

        fixture.gateway.set_flow_status(
            &process.context().uuid().correlation_id(),
            FlowStatus::new(crate::services::FlowStatusKind::Completed),
        );
        state.run(&mut process).await;
        assert_eq!(process.context().current_state_name(), StateName::PlaceOrder);
    }
}
