//! State names of the place-order machine.

use serde::{Deserialize, Serialize};

/// Name of a state in the place-order machine.
///
/// The set is closed: every name resolves to exactly one entry of the
/// `StateCatalog`, and lookups match exhaustively on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StateName {
    #[default]
    New,
    PrepareCart,
    ValidateCart,
    ValidatePaymentSelection,
    CreatePayment,
    ValidatePayment,
    CompletePayment,
    PlaceOrder,
    CompleteCart,
    CloseCart,
    Redirect,
    PostRedirect,
    #[serde(rename = "ShowHTML")]
    ShowHtml,
    ShowIframe,
    ShowWalletPayment,
    #[serde(rename = "TriggerClientSDK")]
    TriggerClientSdk,
    WaitForCustomer,
    Wait,
    Success,
    Failed,
    Canceled,
}

impl StateName {
    /// Every state, in backbone order.
    pub const ALL: [StateName; 21] = [
        StateName::New,
        StateName::PrepareCart,
        StateName::ValidateCart,
        StateName::ValidatePaymentSelection,
        StateName::CreatePayment,
        StateName::ValidatePayment,
        StateName::CompletePayment,
        StateName::PlaceOrder,
        StateName::CompleteCart,
        StateName::CloseCart,
        StateName::Redirect,
        StateName::PostRedirect,
        StateName::ShowHtml,
        StateName::ShowIframe,
        StateName::ShowWalletPayment,
        StateName::TriggerClientSdk,
        StateName::WaitForCustomer,
        StateName::Wait,
        StateName::Success,
        StateName::Failed,
        StateName::Canceled,
    ];

    /// Returns true if this is a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            StateName::Success | StateName::Failed | StateName::Canceled
        )
    }

    /// Returns true if the state waits for something outside the engine
    /// (the customer, a webhook) before it can move on.
    pub fn is_suspension(&self) -> bool {
        matches!(
            self,
            StateName::Redirect
                | StateName::PostRedirect
                | StateName::ShowHtml
                | StateName::ShowIframe
                | StateName::ShowWalletPayment
                | StateName::TriggerClientSdk
                | StateName::WaitForCustomer
                | StateName::Wait
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateName::New => "New",
            StateName::PrepareCart => "PrepareCart",
            StateName::ValidateCart => "ValidateCart",
            StateName::ValidatePaymentSelection => "ValidatePaymentSelection",
            StateName::CreatePayment => "CreatePayment",
            StateName::ValidatePayment => "ValidatePayment",
            StateName::CompletePayment => "CompletePayment",
            StateName::PlaceOrder => "PlaceOrder",
            StateName::CompleteCart => "CompleteCart",
            StateName::CloseCart => "CloseCart",
            StateName::Redirect => "Redirect",
            StateName::PostRedirect => "PostRedirect",
            StateName::ShowHtml => "ShowHTML",
            StateName::ShowIframe => "ShowIframe",
            StateName::ShowWalletPayment => "ShowWalletPayment",
            StateName::TriggerClientSdk => "TriggerClientSDK",
            StateName::WaitForCustomer => "WaitForCustomer",
            StateName::Wait => "Wait",
            StateName::Success => "Success",
            StateName::Failed => "Failed",
            StateName::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
