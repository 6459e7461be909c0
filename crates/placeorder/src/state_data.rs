//! Presentation payloads produced by suspension states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the caller needs to present while the machine waits on the customer.
///
/// The engine never reads it; one variant exists per presentation state so an
/// adapter can map it to its own wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StateData {
    /// Send the customer to `url`.
    Redirect { url: String },
    /// Post `form_fields` to `url` from the customer's browser.
    PostRedirect {
        url: String,
        form_fields: BTreeMap<String, FormField>,
    },
    /// Render the given HTML.
    Html { html: String },
    /// Render `url` in an iframe.
    Iframe { url: String },
    /// Start a wallet payment sheet.
    WalletPayment { wallet: WalletDetails },
    /// Hand `data` to the provider's client SDK loaded from `url`.
    ClientSdk { url: String, data: String },
}

/// A form field of a post redirect. Fields may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub value: Vec<String>,
}

impl FormField {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            value: vec![value.into()],
        }
    }
}

/// Wallet payment request as handed out by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDetails {
    pub used_payment_method: String,
    /// Gateway specific payment request, passed through untouched.
    pub payment_request: serde_json::Value,
}
