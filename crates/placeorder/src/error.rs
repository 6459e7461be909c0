//! Place-order error types.

use context_store::ContextStoreError;
use lock::LockError;
use thiserror::Error;

use crate::context::Context;
use crate::state::StateName;

/// Errors returned to callers of the coordinator and handler.
///
/// Failures inside a transition never show up here: they are recorded as a
/// `FailedReason` on the context, which then sits in the `Failed` state.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Another request holds the lock for this key.
    #[error("Place order process is locked by another request")]
    Locked,

    /// The lock lease ran out while the process was being advanced. Nothing
    /// was stored; the next holder starts from the last persisted context.
    #[error("Lock lease for the place order process was lost")]
    LeaseLost,

    /// Nothing is stored for this key.
    #[error("No place order process exists")]
    NoProcess,

    /// The process already reached a terminal state.
    #[error("Process already in final state, cancel not possible")]
    AlreadyFinal,

    /// The process did not settle before the deadline. Carries the last
    /// persisted context.
    #[error("Timed out waiting for the process, last state {}", .0.current_state_name())]
    Timeout(Box<Context>),

    /// Some compensations failed while canceling. The process is canceled anyway.
    #[error("Rollback incomplete: {0}")]
    Rollback(#[from] RollbackError),

    /// Context store error.
    #[error("Context store error: {0}")]
    Store(#[from] ContextStoreError),

    /// Lock infrastructure error (contention is reported as `Locked`).
    #[error("Lock error: {0}")]
    Lock(LockError),

    /// An external collaborator failed outside of a transition.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl From<LockError> for PlaceOrderError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Taken(_) => PlaceOrderError::Locked,
            other => PlaceOrderError::Lock(other),
        }
    }
}

/// Errors reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Cart service error.
    #[error("Cart service error: {0}")]
    Cart(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Payment(String),

    /// Order service error.
    #[error("Order service error: {0}")]
    Order(String),

    /// No gateway is registered under the selected code.
    #[error("Unknown payment gateway: {0}")]
    UnknownGateway(String),
}

/// Why a single compensation failed.
#[derive(Debug, Error)]
pub enum CompensationError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A state was asked to compensate data it never produces.
    #[error("state {state} cannot compensate {data} data")]
    UnexpectedData { state: StateName, data: &'static str },
}

/// One failed step of a rollback.
#[derive(Debug)]
pub struct RollbackFailure {
    /// The state whose effect could not be compensated.
    pub state: StateName,
    pub error: CompensationError,
}

/// All compensations that failed during one rollback, newest first.
#[derive(Debug, Error)]
#[error("{} compensation(s) failed: {}", .failures.len(), describe(.failures))]
pub struct RollbackError {
    pub failures: Vec<RollbackFailure>,
}

fn describe(failures: &[RollbackFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.state, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience type alias for place-order results.
pub type Result<T> = std::result::Result<T, PlaceOrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_taken_maps_to_locked() {
        let err: PlaceOrderError = LockError::Taken("cart-1".to_string()).into();
        assert!(matches!(err, PlaceOrderError::Locked));
    }

    #[test]
    fn test_rollback_error_lists_every_failure() {
        let err = RollbackError {
            failures: vec![
                RollbackFailure {
                    state: StateName::PlaceOrder,
                    error: ServiceError::Order("order system down".to_string()).into(),
                },
                RollbackFailure {
                    state: StateName::CreatePayment,
                    error: CompensationError::UnexpectedData {
                        state: StateName::CreatePayment,
                        data: "OrdersPlaced",
                    },
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 compensation(s) failed: PlaceOrder: Order service error: order system down; \
             CreatePayment: state CreatePayment cannot compensate OrdersPlaced data"
        );
    }
}
