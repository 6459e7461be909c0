//! The persisted record of one place-order attempt.

use cart::{Cart, PlacedOrder};
use chrono::{DateTime, Utc};
use common::ProcessId;
use serde::{Deserialize, Serialize};

use crate::failed_reason::FailedReason;
use crate::state::StateName;
use crate::state_data::StateData;

/// Data needed to undo the effect of one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RollbackData {
    /// A payment flow was started with the gateway.
    PaymentCreated {
        gateway: String,
        correlation_id: String,
    },
    /// Orders were created from the cart.
    OrdersPlaced { orders: Vec<PlacedOrder> },
    /// The cart was completed or closed; holds the cart as it was before.
    CartRestore { cart: Cart },
}

impl RollbackData {
    pub fn kind(&self) -> &'static str {
        match self {
            RollbackData::PaymentCreated { .. } => "PaymentCreated",
            RollbackData::OrdersPlaced { .. } => "OrdersPlaced",
            RollbackData::CartRestore { .. } => "CartRestore",
        }
    }
}

/// A compensation record: which state produced an effect and how to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReference {
    pub state: StateName,
    pub data: RollbackData,
}

/// Snapshot of a place-order attempt.
///
/// Only the engine mutates a context; everyone else reads it through the
/// accessors. Rollback references are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    uuid: ProcessId,
    current_state_name: StateName,
    current_state_data: Option<StateData>,
    cart: Cart,
    return_url: String,
    rollback_references: Vec<RollbackReference>,
    failed_reason: Option<FailedReason>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Context {
    pub(crate) fn new(
        uuid: ProcessId,
        start_state: StateName,
        cart: Cart,
        return_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            current_state_name: start_state,
            current_state_data: None,
            cart,
            return_url: return_url.into(),
            rollback_references: Vec::new(),
            failed_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Identifier of the attempt; also the payment correlation id.
    pub fn uuid(&self) -> ProcessId {
        self.uuid
    }

    pub fn current_state_name(&self) -> StateName {
        self.current_state_name
    }

    /// Payload for the caller while in a presentation state.
    pub fn current_state_data(&self) -> Option<&StateData> {
        self.current_state_data.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    /// Compensation records, oldest first.
    pub fn rollback_references(&self) -> &[RollbackReference] {
        &self.rollback_references
    }

    /// Set only once the attempt reached `Failed`.
    pub fn failed_reason(&self) -> Option<&FailedReason> {
        self.failed_reason.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true once the attempt reached Success, Failed or Canceled.
    pub fn is_final(&self) -> bool {
        self.current_state_name.is_final()
    }

    pub(crate) fn set_state(&mut self, name: StateName, data: Option<StateData>) {
        self.current_state_name = name;
        self.current_state_data = data;
        self.touch();
    }

    pub(crate) fn set_cart(&mut self, cart: Cart) {
        self.cart = cart;
        self.touch();
    }

    pub(crate) fn push_rollback(&mut self, reference: RollbackReference) {
        self.rollback_references.push(reference);
        self.touch();
    }

    pub(crate) fn set_failed(&mut self, reason: FailedReason) {
        self.failed_reason = Some(reason);
        self.set_state(StateName::Failed, None);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_data::FormField;

    #[test]
    fn test_new_context_starts_clean() {
        let ctx = Context::new(
            ProcessId::new(),
            StateName::New,
            Cart::new("cart-1"),
            "https://shop.example/checkout/return",
        );
        assert_eq!(ctx.current_state_name(), StateName::New);
        assert!(ctx.current_state_data().is_none());
        assert!(ctx.rollback_references().is_empty());
        assert!(ctx.failed_reason().is_none());
        assert!(!ctx.is_final());
    }

    #[test]
    fn test_set_failed_moves_to_failed_and_drops_state_data() {
        let mut ctx = Context::new(ProcessId::new(), StateName::New, Cart::new("c"), "");
        ctx.set_state(
            StateName::Redirect,
            Some(StateData::Redirect {
                url: "https://psp.example".to_string(),
            }),
        );
        ctx.set_failed(FailedReason::PaymentCanceledByCustomer);

        assert_eq!(ctx.current_state_name(), StateName::Failed);
        assert!(ctx.current_state_data().is_none());
        assert_eq!(
            ctx.failed_reason(),
            Some(&FailedReason::PaymentCanceledByCustomer)
        );
        assert!(ctx.is_final());
    }

    #[test]
    fn test_serialization_keeps_polymorphic_payloads() {
        let mut ctx = Context::new(ProcessId::new(), StateName::New, Cart::new("c"), "/return");
        ctx.push_rollback(RollbackReference {
            state: StateName::CreatePayment,
            data: RollbackData::PaymentCreated {
                gateway: "offline".to_string(),
                correlation_id: ctx.uuid().correlation_id(),
            },
        });
        ctx.set_state(
            StateName::PostRedirect,
            Some(StateData::PostRedirect {
                url: "https://psp.example/3ds".to_string(),
                form_fields: [("PaReq".to_string(), FormField::single("abc"))].into(),
            }),
        );

        let json = serde_json::to_string(&ctx).unwrap();
        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);

        ctx.set_failed(FailedReason::error("boom"));
        let json = serde_json::to_string(&ctx).unwrap();
        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back.failed_reason(), Some(&FailedReason::error("boom")));
    }
}
