//! Shared fixtures for the unit tests of this crate.

use std::sync::Arc;

use cart::{Cart, CartItem, Money, PaymentSelection};

use crate::factory::ProcessFactory;
use crate::process::Process;
use crate::services::{
    InMemoryCartService, InMemoryOrderService, InMemoryPaymentGateway, PaymentGateway,
    PaymentGateways, Services,
};
use crate::states::StateCatalog;

/// A $10.00 cart paid through the `offline` gateway with `method`.
pub(crate) fn paid_cart(method: &str) -> Cart {
    Cart::new("cart-1")
        .with_item(CartItem::new("SKU-001", "Widget", 1, Money::from_cents(1000)))
        .with_payment(PaymentSelection::new(
            "offline",
            method,
            Money::from_cents(1000),
        ))
}

/// In-memory collaborators with handles for inspection.
pub(crate) struct Fixture {
    pub carts: InMemoryCartService,
    pub gateway: InMemoryPaymentGateway,
    pub orders: InMemoryOrderService,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            carts: InMemoryCartService::new(),
            gateway: InMemoryPaymentGateway::new("offline"),
            orders: InMemoryOrderService::new(),
        }
    }

    pub fn services(&self) -> Services {
        Services::new(
            Arc::new(self.carts.clone()),
            PaymentGateways::new().with_gateway("offline", Arc::new(self.gateway.clone())),
            Arc::new(self.orders.clone()),
        )
    }

    pub fn catalog(&self) -> StateCatalog {
        StateCatalog::new(self.services())
    }

    pub fn factory(&self) -> ProcessFactory {
        ProcessFactory::new(self.catalog())
    }

    /// A fresh process for `cart`, which is also stored in the cart service.
    pub fn process(&self, cart: Cart) -> Process {
        self.carts.put_cart(cart.clone());
        self.factory().new_process("https://shop.example/return", cart)
    }

    /// Starts the payment flow of `process` on the gateway.
    pub async fn start_flow(&self, process: &Process) {
        let ctx = process.context();
        self.gateway
            .start_flow(
                ctx.cart(),
                &ctx.uuid().correlation_id(),
                ctx.return_url(),
            )
            .await
            .unwrap();
    }
}
