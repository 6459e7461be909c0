//! The cart snapshot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Lifecycle of a cart as seen by order placement.
///
/// ```text
/// Open ──┬──► Completed   (payment settled or not needed)
///        └──► Closed      (order placed early, payment still pending)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CartStatus {
    #[default]
    Open,
    Completed,
    Closed,
}

/// A line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product SKU.
    pub product_id: String,
    /// Human-readable product name.
    pub product_name: String,
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
}

impl CartItem {
    /// Creates a new cart item.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the row total (quantity * unit_price), None on overflow.
    pub fn row_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// The payment method the customer picked for the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSelection {
    /// Code of the payment gateway handling the flow.
    pub gateway: String,
    /// Gateway specific payment method.
    pub method: String,
    /// Amount charged through this selection.
    pub amount: Money,
    /// Sent to the gateway so a retried payment attempt is not charged twice.
    pub idempotency_key: Uuid,
}

impl PaymentSelection {
    /// Creates a selection with a fresh idempotency key.
    pub fn new(gateway: impl Into<String>, method: impl Into<String>, amount: Money) -> Self {
        Self {
            gateway: gateway.into(),
            method: method.into(),
            amount,
            idempotency_key: Uuid::new_v4(),
        }
    }

    /// Replaces the idempotency key with a new one.
    pub fn regenerate_idempotency_key(&mut self) {
        self.idempotency_key = Uuid::new_v4();
    }

    /// Returns true if the selection pays for the given total.
    pub fn covers(&self, total: Money) -> bool {
        self.amount == total
    }
}

/// An order created from the cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_number: String,
}

/// Snapshot of a cart being placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub items: Vec<CartItem>,
    /// Order number reserved before the order is placed.
    pub reserved_order_id: Option<String>,
    pub payment_selection: Option<PaymentSelection>,
    pub status: CartStatus,
    /// Orders created from this cart.
    pub placed_orders: Vec<PlacedOrder>,
}

impl Cart {
    /// Creates an empty open cart.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            reserved_order_id: None,
            payment_selection: None,
            status: CartStatus::Open,
            placed_orders: Vec::new(),
        }
    }

    /// Adds an item, builder style.
    pub fn with_item(mut self, item: CartItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sets the payment selection, builder style.
    pub fn with_payment(mut self, selection: PaymentSelection) -> Self {
        self.payment_selection = Some(selection);
        self
    }

    /// Sum of all row totals. None when the total does not fit in a `Money`.
    pub fn grand_total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |total, item| total.checked_add(item.row_total()?))
    }

    /// True only for a total that is exactly zero; an overflowing total is not.
    pub fn is_zero_total(&self) -> bool {
        self.grand_total().is_some_and(|total| total.is_zero())
    }

    /// Returns true once at least one order was placed from the cart.
    pub fn is_order_placed(&self) -> bool {
        !self.placed_orders.is_empty()
    }
}
