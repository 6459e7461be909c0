//! Reaction to the status of a payment flow, shared by every state that
//! checks on the gateway.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::failed_reason::FailedReason;
use crate::process::Process;
use crate::services::{
    FlowAction, FlowActionData, FlowStatus, FlowStatusKind, Payment, PaymentGateway, Services,
};
use crate::state::StateName;
use crate::state_data::StateData;

use super::RunResult;

/// Correlation id of the process's payment flow.
pub(super) fn correlation_id(process: &Process) -> String {
    process.context().uuid().correlation_id()
}

/// The gateway of the cart's payment selection.
pub(super) fn selected_gateway(
    process: &Process,
    services: &Services,
) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
    let selection = process
        .context()
        .cart()
        .payment_selection
        .as_ref()
        .ok_or_else(|| ServiceError::Payment("no payment method selected".to_string()))?;
    services.payments.gateway(&selection.gateway)
}

/// The payment of the flow, or None when the cart is paid without one.
pub(super) async fn order_payment(
    process: &Process,
    services: &Services,
) -> Result<Option<Payment>, ServiceError> {
    let cart = process.context().cart();
    if cart.is_zero_total() || cart.payment_selection.is_none() {
        return Ok(None);
    }
    let gateway = selected_gateway(process, services)?;
    let payment = gateway
        .order_payment_from_flow(&correlation_id(process))
        .await?;
    Ok(Some(payment))
}

/// Tells the gateway the order for its payment exists.
pub(super) async fn confirm_payment(
    process: &Process,
    services: &Services,
) -> Result<(), ServiceError> {
    if let Some(payment) = order_payment(process, services).await? {
        services
            .payments
            .gateway(&payment.gateway)?
            .confirm_result(process.context().cart(), &payment)
            .await?;
    }
    Ok(())
}

/// Queries the flow status and moves on accordingly.
pub(super) async fn check(process: &mut Process, services: &Services) -> RunResult {
    let status = match selected_gateway(process, services) {
        Ok(gateway) => {
            gateway
                .flow_status(process.context().cart(), &correlation_id(process))
                .await
        }
        Err(e) => Err(e),
    };

    match status {
        Ok(status) => apply(process, services, status).await,
        Err(e) => RunResult::failed(FailedReason::payment(e.to_string())),
    }
}

/// Moves the process according to `status`.
pub(super) async fn apply(
    process: &mut Process,
    services: &Services,
    status: FlowStatus,
) -> RunResult {
    match status.status {
        FlowStatusKind::Unapproved => match present(status.action, status.action_data) {
            Ok((next, data)) => {
                process.update_state(next, data);
                RunResult::proceed()
            }
            Err(reason) => RunResult::failed(reason),
        },
        FlowStatusKind::Approved => {
            process.update_state(StateName::CompletePayment, None);
            RunResult::proceed()
        }
        FlowStatusKind::Completed => {
            if !process.context().cart().is_order_placed() {
                process.update_state(StateName::PlaceOrder, None);
                return RunResult::proceed();
            }
            match confirm_payment(process, services).await {
                Ok(()) => {
                    process.update_state(StateName::Success, None);
                    RunResult::proceed()
                }
                Err(e) => RunResult::failed(FailedReason::payment(e.to_string())),
            }
        }
        FlowStatusKind::Failed => RunResult::failed(FailedReason::payment(
            status.error.unwrap_or_else(|| "payment failed".to_string()),
        )),
        FlowStatusKind::Canceled => RunResult::failed(FailedReason::payment(
            status.error.unwrap_or_else(|| "payment canceled".to_string()),
        )),
        FlowStatusKind::Aborted => RunResult::failed(FailedReason::PaymentCanceledByCustomer),
        FlowStatusKind::WaitingForCustomer | FlowStatusKind::Other(_) => {
            process.update_state(StateName::Wait, None);
            RunResult::proceed()
        }
    }
}

/// Maps the action of an unapproved flow to a presentation state.
fn present(
    action: Option<FlowAction>,
    data: FlowActionData,
) -> Result<(StateName, Option<StateData>), FailedReason> {
    let action = action
        .ok_or_else(|| FailedReason::error("payment is unapproved but the gateway requests no action"))?;

    let missing = |what: &str, state: StateName| {
        FailedReason::error(format!("payment action {state} is missing its {what}"))
    };

    match action {
        FlowAction::Redirect => {
            let url = data.url.ok_or_else(|| missing("url", StateName::Redirect))?;
            Ok((StateName::Redirect, Some(StateData::Redirect { url })))
        }
        FlowAction::PostRedirect => {
            let url = data
                .url
                .ok_or_else(|| missing("url", StateName::PostRedirect))?;
            Ok((
                StateName::PostRedirect,
                Some(StateData::PostRedirect {
                    url,
                    form_fields: data.form_fields,
                }),
            ))
        }
        FlowAction::ShowHtml => {
            let html = data
                .display_data
                .ok_or_else(|| missing("html", StateName::ShowHtml))?;
            Ok((StateName::ShowHtml, Some(StateData::Html { html })))
        }
        FlowAction::ShowIframe => {
            let url = data
                .url
                .ok_or_else(|| missing("url", StateName::ShowIframe))?;
            Ok((StateName::ShowIframe, Some(StateData::Iframe { url })))
        }
        FlowAction::ShowWalletPayment => {
            let wallet = data
                .wallet_details
                .ok_or_else(|| missing("wallet details", StateName::ShowWalletPayment))?;
            Ok((
                StateName::ShowWalletPayment,
                Some(StateData::WalletPayment { wallet }),
            ))
        }
        FlowAction::TriggerClientSdk => {
            let url = data
                .url
                .ok_or_else(|| missing("url", StateName::TriggerClientSdk))?;
            let sdk_data = data
                .display_data
                .ok_or_else(|| missing("sdk data", StateName::TriggerClientSdk))?;
            Ok((
                StateName::TriggerClientSdk,
                Some(StateData::ClientSdk {
                    url,
                    data: sdk_data,
                }),
            ))
        }
        FlowAction::WaitForCustomer => Ok((StateName::WaitForCustomer, None)),
        FlowAction::Other(other) => Err(FailedReason::error(format!(
            "unsupported payment action {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_data::{FormField, WalletDetails};
    use crate::testing::{Fixture, paid_cart};

    fn unapproved(action: FlowAction, data: FlowActionData) -> FlowStatus {
        FlowStatus::unapproved(action, data)
    }

    async fn apply_to_fresh(status: FlowStatus) -> (Process, RunResult) {
        let fixture = Fixture::new();
        let mut process = fixture.process(paid_cart("completed"));
        let result = apply(&mut process, &fixture.services(), status).await;
        (process, result)
    }

    #[tokio::test]
    async fn test_unapproved_actions_map_to_presentation_states() {
        let url = Some("https://psp.example/pay".to_string());
        let cases = vec![
            (
                unapproved(
                    FlowAction::Redirect,
                    FlowActionData {
                        url: url.clone(),
                        ..Default::default()
                    },
                ),
                StateName::Redirect,
            ),
            (
                unapproved(
                    FlowAction::PostRedirect,
                    FlowActionData {
                        url: url.clone(),
                        form_fields: [("PaReq".to_string(), FormField::single("x"))].into(),
                        ..Default::default()
                    },
                ),
                StateName::PostRedirect,
            ),
            (
                unapproved(
                    FlowAction::ShowHtml,
                    FlowActionData {
                        display_data: Some("<form/>".to_string()),
                        ..Default::default()
                    },
                ),
                StateName::ShowHtml,
            ),
            (
                unapproved(
                    FlowAction::ShowIframe,
                    FlowActionData {
                        url: url.clone(),
                        ..Default::default()
                    },
                ),
                StateName::ShowIframe,
            ),
            (
                unapproved(
                    FlowAction::ShowWalletPayment,
                    FlowActionData {
                        wallet_details: Some(WalletDetails {
                            used_payment_method: "applepay".to_string(),
                            payment_request: serde_json::json!({ "total": 1000 }),
                        }),
                        ..Default::default()
                    },
                ),
                StateName::ShowWalletPayment,
            ),
            (
                unapproved(
                    FlowAction::TriggerClientSdk,
                    FlowActionData {
                        url: url.clone(),
                        display_data: Some("{\"token\":\"t\"}".to_string()),
                        ..Default::default()
                    },
                ),
                StateName::TriggerClientSdk,
            ),
            (
                unapproved(FlowAction::WaitForCustomer, FlowActionData::default()),
                StateName::WaitForCustomer,
            ),
        ];

        for (status, expected) in cases {
            let (process, result) = apply_to_fresh(status).await;
            assert!(!result.is_failed(), "{expected} failed");
            assert_eq!(process.context().current_state_name(), expected);
        }
    }

    #[tokio::test]
    async fn test_post_redirect_carries_form_fields() {
        let fields: std::collections::BTreeMap<_, _> =
            [("MD".to_string(), FormField::single("123"))].into();
        let (process, _) = apply_to_fresh(unapproved(
            FlowAction::PostRedirect,
            FlowActionData {
                url: Some("https://acs.example".to_string()),
                form_fields: fields.clone(),
                ..Default::default()
            },
        ))
        .await;

        assert_eq!(
            process.context().current_state_data(),
            Some(&StateData::PostRedirect {
                url: "https://acs.example".to_string(),
                form_fields: fields,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_action_data_fails() {
        let (_, result) =
            apply_to_fresh(unapproved(FlowAction::Redirect, FlowActionData::default())).await;
        assert_eq!(
            result.failed,
            Some(FailedReason::error("payment action Redirect is missing its url"))
        );
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let (_, result) = apply_to_fresh(unapproved(
            FlowAction::Other("QrCode".to_string()),
            FlowActionData::default(),
        ))
        .await;
        assert_eq!(
            result.failed,
            Some(FailedReason::error("unsupported payment action QrCode"))
        );
    }

    #[tokio::test]
    async fn test_terminal_statuses() {
        let (_, result) = apply_to_fresh(FlowStatus::failed("insufficient funds")).await;
        assert_eq!(
            result.failed,
            Some(FailedReason::payment("insufficient funds"))
        );

        let (_, result) = apply_to_fresh(FlowStatus::new(FlowStatusKind::Aborted)).await;
        assert_eq!(result.failed, Some(FailedReason::PaymentCanceledByCustomer));
    }

    #[tokio::test]
    async fn test_pending_statuses() {
        let (process, _) = apply_to_fresh(FlowStatus::new(FlowStatusKind::Approved)).await;
        assert_eq!(
            process.context().current_state_name(),
            StateName::CompletePayment
        );

        let (process, _) =
            apply_to_fresh(FlowStatus::new(FlowStatusKind::Other("PENDING".to_string()))).await;
        assert_eq!(process.context().current_state_name(), StateName::Wait);

        let (process, _) = apply_to_fresh(FlowStatus::new(FlowStatusKind::Completed)).await;
        assert_eq!(process.context().current_state_name(), StateName::PlaceOrder);
    }
}
