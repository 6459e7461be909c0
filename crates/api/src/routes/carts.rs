//! Cart endpoints backed by the in-memory cart service.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart::{Cart, CartItem, Money, PaymentSelection};
use context_store::ContextStore;
use lock::Locker;
use placeorder::Context;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CartRequest {
    pub items: Vec<CartItemRequest>,
    pub payment: Option<PaymentRequest>,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    /// Gateway code, `offline` if omitted.
    pub gateway: Option<String>,
    pub method: String,
    /// Defaults to the cart's grand total.
    pub amount_cents: Option<i64>,
}

impl CartRequest {
    fn into_cart(self, key: &str) -> Result<Cart, ApiError> {
        let mut cart = Cart::new(key);
        for item in self.items {
            if item.unit_price_cents < 0 {
                return Err(ApiError::BadRequest(format!(
                    "Negative price for {}",
                    item.product_id
                )));
            }
            cart = cart.with_item(CartItem::new(
                item.product_id,
                item.product_name,
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            ));
        }

        let total = cart
            .grand_total()
            .ok_or_else(|| ApiError::BadRequest("Cart total is out of range".to_string()))?;

        if let Some(payment) = self.payment {
            let amount = payment
                .amount_cents
                .map(Money::from_cents)
                .unwrap_or(total);
            cart = cart.with_payment(PaymentSelection::new(
                payment.gateway.unwrap_or_else(|| "offline".to_string()),
                payment.method,
                amount,
            ));
        }
        Ok(cart)
    }
}

/// PUT /carts/{key}: replaces the cart of `key`.
#[tracing::instrument(skip(state, req))]
pub async fn put<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
    Json(req): Json<CartRequest>,
) -> Result<Json<Cart>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    let cart = req.into_cart(&key)?;
    state.carts.put_cart(cart.clone());
    Ok(Json(cart))
}

/// GET /carts/{key}
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(key): Path<String>,
) -> Result<Json<Cart>, ApiError>
where
    S: ContextStore<Context> + 'static,
    L: Locker + 'static,
{
    state
        .carts
        .cart(&key)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Cart {key} not found")))
}
