//! Cart service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use cart::{Cart, CartStatus, ValidationResult};

use crate::error::ServiceError;

/// Trait for the cart operations the place-order states need.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Loads the cart currently associated with `key`.
    async fn current_cart(&self, key: &str) -> Result<Cart, ServiceError>;

    /// Reserves an order number for the cart and saves it on the cart.
    ///
    /// Reserving again keeps the already reserved number.
    async fn reserve_order_id(&self, cart: &Cart) -> Result<Cart, ServiceError>;

    /// Gives the payment selection a fresh idempotency key and saves it.
    async fn regenerate_idempotency_key(&self, cart: &Cart) -> Result<Cart, ServiceError>;

    /// Validates the cart.
    async fn validate_cart(&self, cart: &Cart) -> Result<ValidationResult, ServiceError>;

    /// Marks the cart as completed; the customer continues with a new cart.
    async fn complete_cart(&self, cart: &Cart) -> Result<Cart, ServiceError>;

    /// Closes the cart against changes while its payment is still pending.
    async fn close_cart(&self, cart: &Cart) -> Result<Cart, ServiceError>;

    /// Brings back the given cart as the customer's open cart.
    async fn restore_cart(&self, cart: &Cart) -> Result<Cart, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<String, Cart>,
    next_order_id: u32,
    fail_on_reserve: bool,
    fail_on_restore: bool,
    validation_errors: Vec<String>,
    restored: u32,
}

/// In-memory cart service for testing. Carts are keyed by their id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new in-memory cart service.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryCartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryCartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a cart, replacing any cart with the same id.
    pub fn put_cart(&self, cart: Cart) {
        self.write().carts.insert(cart.id.clone(), cart);
    }

    /// Returns the stored version of a cart.
    pub fn cart(&self, id: &str) -> Option<Cart> {
        self.read().carts.get(id).cloned()
    }

    /// Configures the service to fail on order id reservation.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.write().fail_on_reserve = fail;
    }

    /// Configures the service to fail when restoring a cart.
    pub fn set_fail_on_restore(&self, fail: bool) {
        self.write().fail_on_restore = fail;
    }

    /// Makes every validation report the given errors.
    pub fn set_validation_errors<I, S>(&self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().validation_errors = errors.into_iter().map(Into::into).collect();
    }

    /// Returns how many carts were restored.
    pub fn restore_count(&self) -> u32 {
        self.read().restored
    }

    fn save(&self, cart: Cart) -> Cart {
        self.write().carts.insert(cart.id.clone(), cart.clone());
        cart
    }

    fn with_status(&self, cart: &Cart, status: CartStatus) -> Cart {
        let mut updated = cart.clone();
        updated.status = status;
        self.save(updated)
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn current_cart(&self, key: &str) -> Result<Cart, ServiceError> {
        self.cart(key)
            .ok_or_else(|| ServiceError::Cart(format!("no cart for {key}")))
    }

    async fn reserve_order_id(&self, cart: &Cart) -> Result<Cart, ServiceError> {
        let mut updated = cart.clone();
        if updated.reserved_order_id.is_none() {
            let mut state = self.write();
            if state.fail_on_reserve {
                return Err(ServiceError::Cart("order id reservation failed".to_string()));
            }
            state.next_order_id += 1;
            updated.reserved_order_id = Some(format!("ORD-{:04}", state.next_order_id));
        }
        Ok(self.save(updated))
    }

    async fn regenerate_idempotency_key(&self, cart: &Cart) -> Result<Cart, ServiceError> {
        let mut updated = cart.clone();
        let selection = updated
            .payment_selection
            .as_mut()
            .ok_or_else(|| ServiceError::Cart("cart has no payment selection".to_string()))?;
        selection.regenerate_idempotency_key();
        Ok(self.save(updated))
    }

    async fn validate_cart(&self, cart: &Cart) -> Result<ValidationResult, ServiceError> {
        let mut errors = self.read().validation_errors.clone();
        if cart.items.is_empty() {
            errors.push("cart is empty".to_string());
        }
        if cart.items.iter().any(|item| item.quantity == 0) {
            errors.push("cart contains an item with zero quantity".to_string());
        }
        Ok(ValidationResult { errors })
    }

    async fn complete_cart(&self, cart: &Cart) -> Result<Cart, ServiceError> {
        Ok(self.with_status(cart, CartStatus::Completed))
    }

    async fn close_cart(&self, cart: &Cart) -> Result<Cart, ServiceError> {
        Ok(self.with_status(cart, CartStatus::Closed))
    }

    async fn restore_cart(&self, cart: &Cart) -> Result<Cart, ServiceError> {
        {
            let mut state = self.write();
            if state.fail_on_restore {
                return Err(ServiceError::Cart("cart restore failed".to_string()));
            }
            state.restored += 1;
        }
        Ok(self.with_status(cart, CartStatus::Open))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart::{CartItem, Money, PaymentSelection};

    fn cart() -> Cart {
        Cart::new("cart-1")
            .with_item(CartItem::new("SKU-001", "Widget", 1, Money::from_cents(1000)))
            .with_payment(PaymentSelection::new(
                "offline",
                "completed",
                Money::from_cents(1000),
            ))
    }

    #[tokio::test]
    async fn test_reserve_order_id_is_stable() {
        let service = InMemoryCartService::new();
        let reserved = service.reserve_order_id(&cart()).await.unwrap();
        assert_eq!(reserved.reserved_order_id.as_deref(), Some("ORD-0001"));

        let again = service.reserve_order_id(&reserved).await.unwrap();
        assert_eq!(again.reserved_order_id.as_deref(), Some("ORD-0001"));
        assert_eq!(service.cart("cart-1"), Some(again));
    }

    #[tokio::test]
    async fn test_regenerate_idempotency_key_requires_selection() {
        let service = InMemoryCartService::new();
        let before = cart();
        let after = service.regenerate_idempotency_key(&before).await.unwrap();
        assert_ne!(
            before.payment_selection.unwrap().idempotency_key,
            after.payment_selection.unwrap().idempotency_key
        );

        let err = service
            .regenerate_idempotency_key(&Cart::new("no-payment"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Cart(_)));
    }

    #[tokio::test]
    async fn test_validation() {
        let service = InMemoryCartService::new();
        assert!(service.validate_cart(&cart()).await.unwrap().is_valid());

        let result = service.validate_cart(&Cart::new("empty")).await.unwrap();
        assert_eq!(result.errors, vec!["cart is empty".to_string()]);
    }

    #[tokio::test]
    async fn test_complete_and_restore() {
        let service = InMemoryCartService::new();
        let completed = service.complete_cart(&cart()).await.unwrap();
        assert_eq!(completed.status, CartStatus::Completed);

        let restored = service.restore_cart(&cart()).await.unwrap();
        assert_eq!(restored.status, CartStatus::Open);
        assert_eq!(service.restore_count(), 1);
    }
}
