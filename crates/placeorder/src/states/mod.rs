//! The state catalog of the place-order machine.
//!
//! Every [`StateName`] resolves to exactly one [`State`]. A state advances the
//! process by calling [`Process::update_state`] before it returns; a state
//! that neither moves nor fails is simply entered again on the next run.

mod cart_status;
mod order;
mod payment;
mod payment_flow;
mod prepare;
mod suspension;
mod terminal;

use async_trait::async_trait;

use crate::context::RollbackData;
use crate::error::CompensationError;
use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::Services;
use crate::state::StateName;

use self::cart_status::{CloseCart, CompleteCart};
use self::order::PlaceOrder;
use self::payment::{CompletePayment, CreatePayment, ValidatePayment};
use self::prepare::{New, PrepareCart, ValidateCart, ValidatePaymentSelection};
use self::suspension::{AwaitCustomer, Presentation};
use self::terminal::Terminal;

/// Outcome of running a state once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Appended to the rollback history of the context.
    pub rollback_data: Option<RollbackData>,
    /// Moves the context to `Failed`.
    pub failed: Option<FailedReason>,
}

impl RunResult {
    /// Nothing to compensate, no failure.
    pub fn proceed() -> Self {
        Self::default()
    }

    /// Records an effect that has to be undone on cancel or failure.
    pub fn with_rollback(data: RollbackData) -> Self {
        Self {
            rollback_data: Some(data),
            failed: None,
        }
    }

    pub fn failed(reason: FailedReason) -> Self {
        Self {
            rollback_data: None,
            failed: Some(reason),
        }
    }

    /// Marks the result as failed, keeping its rollback data.
    pub fn and_failed(mut self, reason: FailedReason) -> Self {
        self.failed = Some(reason);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

/// A state of the place-order machine.
#[async_trait]
pub trait State: Send + Sync {
    fn name(&self) -> StateName;

    fn is_final(&self) -> bool {
        self.name().is_final()
    }

    /// Runs the state once against `process`.
    async fn run(&self, process: &mut Process) -> RunResult;

    /// Undoes the effect described by `data`, which this state produced.
    ///
    /// States that never produce rollback data reject any data given to them.
    async fn rollback(&self, data: &RollbackData) -> Result<(), CompensationError> {
        Err(unexpected(self.name(), data))
    }
}

pub(crate) fn unexpected(state: StateName, data: &RollbackData) -> CompensationError {
    CompensationError::UnexpectedData {
        state,
        data: data.kind(),
    }
}

/// Resolves state names to their implementation.
pub struct StateCatalog {
    new: New,
    prepare_cart: PrepareCart,
    validate_cart: ValidateCart,
    validate_payment_selection: ValidatePaymentSelection,
    create_payment: CreatePayment,
    validate_payment: ValidatePayment,
    complete_payment: CompletePayment,
    place_order: PlaceOrder,
    complete_cart: CompleteCart,
    close_cart: CloseCart,
    redirect: Presentation,
    post_redirect: Presentation,
    show_html: Presentation,
    show_iframe: Presentation,
    wait: Presentation,
    show_wallet_payment: AwaitCustomer,
    trigger_client_sdk: AwaitCustomer,
    wait_for_customer: AwaitCustomer,
    success: Terminal,
    failed: Terminal,
    canceled: Terminal,
}

impl StateCatalog {
    /// Builds every state against the given collaborators.
    pub fn new(services: Services) -> Self {
        Self {
            new: New,
            prepare_cart: PrepareCart::new(services.clone()),
            validate_cart: ValidateCart::new(services.clone()),
            validate_payment_selection: ValidatePaymentSelection,
            create_payment: CreatePayment::new(services.clone()),
            validate_payment: ValidatePayment::new(services.clone()),
            complete_payment: CompletePayment::new(services.clone()),
            place_order: PlaceOrder::new(services.clone()),
            complete_cart: CompleteCart::new(services.clone()),
            close_cart: CloseCart::new(services.clone()),
            redirect: Presentation::new(StateName::Redirect),
            post_redirect: Presentation::new(StateName::PostRedirect),
            show_html: Presentation::new(StateName::ShowHtml),
            show_iframe: Presentation::new(StateName::ShowIframe),
            wait: Presentation::new(StateName::Wait),
            show_wallet_payment: AwaitCustomer::new(StateName::ShowWalletPayment, services.clone()),
            trigger_client_sdk: AwaitCustomer::new(StateName::TriggerClientSdk, services.clone()),
            wait_for_customer: AwaitCustomer::new(StateName::WaitForCustomer, services),
            success: Terminal::new(StateName::Success),
            failed: Terminal::new(StateName::Failed),
            canceled: Terminal::new(StateName::Canceled),
        }
    }

    /// Returns the state registered under `name`.
    pub fn get(&self, name: StateName) -> &dyn State {
        match name {
            StateName::New => &self.new,
            StateName::PrepareCart => &self.prepare_cart,
            StateName::ValidateCart => &self.validate_cart,
            StateName::ValidatePaymentSelection => &self.validate_payment_selection,
            StateName::CreatePayment => &self.create_payment,
            StateName::ValidatePayment => &self.validate_payment,
            StateName::CompletePayment => &self.complete_payment,
            StateName::PlaceOrder => &self.place_order,
            StateName::CompleteCart => &self.complete_cart,
            StateName::CloseCart => &self.close_cart,
            StateName::Redirect => &self.redirect,
            StateName::PostRedirect => &self.post_redirect,
            StateName::ShowHtml => &self.show_html,
            StateName::ShowIframe => &self.show_iframe,
            StateName::ShowWalletPayment => &self.show_wallet_payment,
            StateName::TriggerClientSdk => &self.trigger_client_sdk,
            StateName::WaitForCustomer => &self.wait_for_customer,
            StateName::Wait => &self.wait,
            StateName::Success => &self.success,
            StateName::Failed => &self.failed,
            StateName::Canceled => &self.canceled,
        }
    }
}
