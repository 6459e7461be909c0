//! States preparing and checking the cart before any payment starts.

use async_trait::async_trait;

use cart::ValidationResult;

use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::Services;
use crate::state::StateName;

use super::{RunResult, State};

const TOTAL_OUT_OF_RANGE: &str = "cart total is out of range";

fn total_out_of_range() -> RunResult {
    RunResult::failed(FailedReason::CartValidation {
        result: ValidationResult::invalid([TOTAL_OUT_OF_RANGE]),
    })
}

/// Entry state of every attempt.
pub(super) struct New;

#[async_trait]
impl State for New {
    fn name(&self) -> StateName {
        StateName::New
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        process.update_state(StateName::PrepareCart, None);
        RunResult::proceed()
    }
}

/// Reserves the order number and renews the payment idempotency key.
pub(super) struct PrepareCart {
    services: Services,
}

impl PrepareCart {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for PrepareCart {
    fn name(&self) -> StateName {
        StateName::PrepareCart
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let carts = &self.services.carts;

        let mut cart = match carts.reserve_order_id(process.context().cart()).await {
            Ok(cart) => cart,
            Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
        };

        // A new attempt must not be deduplicated against an earlier one.
        if !cart.is_zero_total() && cart.payment_selection.is_some() {
            cart = match carts.regenerate_idempotency_key(&cart).await {
                Ok(cart) => cart,
                Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
            };
        }

        process.update_cart(cart);
        process.update_state(StateName::ValidateCart, None);
        RunResult::proceed()
    }
}

pub(super) struct ValidateCart {
    services: Services,
}

impl ValidateCart {
    pub(super) fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl State for ValidateCart {
    fn name(&self) -> StateName {
        StateName::ValidateCart
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let result = match self
            .services
            .carts
            .validate_cart(process.context().cart())
            .await
        {
            Ok(result) => result,
            Err(e) => return RunResult::failed(FailedReason::error(e.to_string())),
        };

        if !result.is_valid() {
            return RunResult::failed(FailedReason::CartValidation { result });
        }

        let Some(total) = process.context().cart().grand_total() else {
            return total_out_of_range();
        };
        let next = if total.is_zero() {
            StateName::CompleteCart
        } else {
            StateName::ValidatePaymentSelection
        };
        process.update_state(next, None);
        RunResult::proceed()
    }
}

/// Checks that the selected payment pays for the whole cart.
pub(super) struct ValidatePaymentSelection;

#[async_trait]
impl State for ValidatePaymentSelection {
    fn name(&self) -> StateName {
        StateName::ValidatePaymentSelection
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let cart = process.context().cart();
        let Some(total) = cart.grand_total() else {
            return total_out_of_range();
        };

        let Some(selection) = cart.payment_selection.as_ref() else {
            return RunResult::failed(FailedReason::payment("no payment method selected"));
        };
        if !selection.covers(total) {
            return RunResult::failed(FailedReason::payment(format!(
                "payment amount {} does not cover the cart total {}",
                selection.amount, total
            )));
        }

        process.update_state(StateName::CreatePayment, None);
        RunResult::proceed()
    }
}
