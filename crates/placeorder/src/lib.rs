//! Place-order orchestration.
//!
//! Drives a cart snapshot through a persisted state machine from `New` to one
//! of the terminal states `Success`, `Failed` or `Canceled`:
//!
//! ```text
//! New → PrepareCart → ValidateCart ─┬─► ValidatePaymentSelection → CreatePayment ─┬─► ValidatePayment
//!                                   │                                             └─► PlaceOrder (early)
//!                                   └─► CompleteCart → PlaceOrder → Success (zero total)
//! ```
//!
//! A [`Coordinator`] makes sure only one request advances a given key at a
//! time, persists the [`Context`] after every step so an attempt survives
//! redirects to payment providers, and compensates recorded side effects in
//! reverse order when an attempt is canceled or fails.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod failed_reason;
pub mod handler;
pub mod process;
pub mod services;
pub mod state;
pub mod state_data;
pub mod states;

#[cfg(test)]
mod testing;

pub use config::PlaceOrderConfig;
pub use context::{Context, RollbackData, RollbackReference};
pub use coordinator::Coordinator;
pub use error::{
    CompensationError, PlaceOrderError, Result, RollbackError, RollbackFailure, ServiceError,
};
pub use factory::ProcessFactory;
pub use failed_reason::FailedReason;
pub use handler::{PlaceOrderCommand, PlaceOrderHandler, PlaceOrderInfo, PlaceOrderOutcome};
pub use process::Process;
pub use services::{
    CartService, FlowAction, FlowActionData, FlowResult, FlowStatus, FlowStatusKind,
    InMemoryCartService, InMemoryOrderService, InMemoryPaymentGateway, OrderService, Payment,
    PaymentGateway, PaymentGateways, Services,
};
pub use state::StateName;
pub use state_data::{FormField, StateData, WalletDetails};
pub use states::{RunResult, State, StateCatalog};
