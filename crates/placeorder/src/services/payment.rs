//! Payment gateway trait, gateway registry and in-memory gateway.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use cart::{Cart, Money};

use crate::error::ServiceError;
use crate::state_data::{FormField, WalletDetails};

/// Status of a payment flow as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatusKind {
    /// The customer still has to approve; see the flow's action.
    Unapproved,
    /// Approved by the customer, waiting to be completed.
    Approved,
    /// Payment is settled.
    Completed,
    Failed,
    Canceled,
    /// The customer aborted the payment.
    Aborted,
    WaitingForCustomer,
    /// A status this engine doesn't know.
    Other(String),
}

/// What the customer has to do for an unapproved flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    Redirect,
    PostRedirect,
    ShowHtml,
    ShowIframe,
    ShowWalletPayment,
    TriggerClientSdk,
    WaitForCustomer,
    Other(String),
}

/// Data accompanying a flow action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowActionData {
    pub url: Option<String>,
    /// HTML or SDK payload, depending on the action.
    pub display_data: Option<String>,
    pub form_fields: BTreeMap<String, FormField>,
    pub wallet_details: Option<WalletDetails>,
}

/// Snapshot of a payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatus {
    pub status: FlowStatusKind,
    pub action: Option<FlowAction>,
    pub action_data: FlowActionData,
    /// Gateway error message for failed flows.
    pub error: Option<String>,
}

impl FlowStatus {
    /// A status without action.
    pub fn new(status: FlowStatusKind) -> Self {
        Self {
            status,
            action: None,
            action_data: FlowActionData::default(),
            error: None,
        }
    }

    /// An unapproved status asking for `action`.
    pub fn unapproved(action: FlowAction, action_data: FlowActionData) -> Self {
        Self {
            status: FlowStatusKind::Unapproved,
            action: Some(action),
            action_data,
            error: None,
        }
    }

    /// A failed status carrying the gateway's error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(FlowStatusKind::Failed)
        }
    }
}

/// Result of starting a payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowResult {
    /// The order must be placed before the payment settles.
    pub early_place_order: bool,
    pub status: FlowStatus,
}

/// A payment as attached to a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub gateway: String,
    pub method: String,
    pub amount: Money,
    pub transaction_id: String,
}

/// Trait for payment gateway operations.
///
/// Flows are identified by the correlation id handed to `start_flow`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a payment flow for the cart's payment selection.
    async fn start_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
        return_url: &str,
    ) -> Result<FlowResult, ServiceError>;

    /// Returns the live status of a flow.
    async fn flow_status(&self, cart: &Cart, correlation_id: &str)
    -> Result<FlowStatus, ServiceError>;

    /// Completes an approved flow.
    async fn complete_flow(&self, cart: &Cart, correlation_id: &str) -> Result<(), ServiceError>;

    /// Returns the payment that results from a flow.
    async fn order_payment_from_flow(&self, correlation_id: &str) -> Result<Payment, ServiceError>;

    /// Tells the gateway the order for this payment was placed.
    async fn confirm_result(&self, cart: &Cart, payment: &Payment) -> Result<(), ServiceError>;

    /// Voids or refunds a payment.
    async fn cancel_order_payment(&self, payment: &Payment) -> Result<(), ServiceError>;
}

/// Registry resolving gateways by code.
#[derive(Clone, Default)]
pub struct PaymentGateways {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
}

impl PaymentGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` under `code`, builder style.
    pub fn with_gateway(mut self, code: impl Into<String>, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(code.into(), gateway);
        self
    }

    /// Returns the gateway registered under `code`.
    pub fn gateway(&self, code: &str) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
        self.gateways
            .get(code)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownGateway(code.to_string()))
    }
}

#[derive(Debug, Clone)]
struct Flow {
    method: String,
    amount: Money,
    status: FlowStatus,
    confirmed: bool,
    canceled: bool,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    methods: HashMap<String, FlowStatus>,
    early_place_order: HashSet<String>,
    flows: HashMap<String, Flow>,
    canceled_payments: Vec<String>,
    fail_on_cancel: bool,
}

/// In-memory gateway for testing and demos.
///
/// The status of a new flow is decided by the selected payment method. The
/// built-in methods are:
///
/// | method | status |
/// |---|---|
/// | `completed` | Completed |
/// | `approved` | Approved, Completed after `complete_flow` |
/// | `redirect` | Unapproved, redirect to `https://psp.example/pay` |
/// | `waiting` | WaitingForCustomer |
/// | `failed` | Failed, "card declined" |
/// | `canceled` | Canceled |
/// | `aborted` | Aborted |
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    code: String,
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a gateway with the built-in methods.
    pub fn new(code: impl Into<String>) -> Self {
        let redirect = FlowStatus::unapproved(
            FlowAction::Redirect,
            FlowActionData {
                url: Some("https://psp.example/pay".to_string()),
                ..FlowActionData::default()
            },
        );
        let methods = HashMap::from([
            ("completed".to_string(), FlowStatus::new(FlowStatusKind::Completed)),
            ("approved".to_string(), FlowStatus::new(FlowStatusKind::Approved)),
            ("redirect".to_string(), redirect),
            (
                "waiting".to_string(),
                FlowStatus::new(FlowStatusKind::WaitingForCustomer),
            ),
            ("failed".to_string(), FlowStatus::failed("card declined")),
            ("canceled".to_string(), FlowStatus::new(FlowStatusKind::Canceled)),
            ("aborted".to_string(), FlowStatus::new(FlowStatusKind::Aborted)),
        ]);

        Self {
            code: code.into(),
            state: Arc::new(RwLock::new(InMemoryGatewayState {
                methods,
                ..InMemoryGatewayState::default()
            })),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryGatewayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the initial flow status of `method`.
    pub fn set_method_status(&self, method: impl Into<String>, status: FlowStatus) {
        self.write().methods.insert(method.into(), status);
    }

    /// Makes flows of `method` ask for early order placement.
    pub fn set_early_place_order(&self, method: impl Into<String>) {
        self.write().early_place_order.insert(method.into());
    }

    /// Changes the status of a running flow, as a provider callback would.
    pub fn set_flow_status(&self, correlation_id: &str, status: FlowStatus) {
        if let Some(flow) = self.write().flows.get_mut(correlation_id) {
            flow.status = status;
        }
    }

    /// Configures the gateway to fail when canceling payments.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
    }

    /// Returns true if a flow exists for the correlation id.
    pub fn has_flow(&self, correlation_id: &str) -> bool {
        self.read().flows.contains_key(correlation_id)
    }

    /// Returns true if the payment of the flow was confirmed.
    pub fn is_confirmed(&self, correlation_id: &str) -> bool {
        self.read()
            .flows
            .get(correlation_id)
            .is_some_and(|f| f.confirmed)
    }

    /// Transaction ids of canceled payments, in cancel order.
    pub fn canceled_payments(&self) -> Vec<String> {
        self.read().canceled_payments.clone()
    }

    fn flow(&self, correlation_id: &str) -> Result<Flow, ServiceError> {
        self.read()
            .flows
            .get(correlation_id)
            .cloned()
            .ok_or_else(|| ServiceError::Payment(format!("no flow for {correlation_id}")))
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn start_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
        _return_url: &str,
    ) -> Result<FlowResult, ServiceError> {
        let selection = cart
            .payment_selection
            .as_ref()
            .ok_or_else(|| ServiceError::Payment("cart has no payment selection".to_string()))?;

        let mut state = self.write();
        let status = state
            .methods
            .get(&selection.method)
            .cloned()
            .ok_or_else(|| {
                ServiceError::Payment(format!("unsupported payment method {}", selection.method))
            })?;
        let early_place_order = state.early_place_order.contains(&selection.method);

        state.flows.insert(
            correlation_id.to_string(),
            Flow {
                method: selection.method.clone(),
                amount: selection.amount,
                status: status.clone(),
                confirmed: false,
                canceled: false,
            },
        );

        Ok(FlowResult {
            early_place_order,
            status,
        })
    }

    async fn flow_status(
        &self,
        _cart: &Cart,
        correlation_id: &str,
    ) -> Result<FlowStatus, ServiceError> {
        self.flow(correlation_id).map(|f| f.status)
    }

    async fn complete_flow(&self, _cart: &Cart, correlation_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        let flow = state
            .flows
            .get_mut(correlation_id)
            .ok_or_else(|| ServiceError::Payment(format!("no flow for {correlation_id}")))?;
        if flow.status.status != FlowStatusKind::Approved {
            return Err(ServiceError::Payment(format!(
                "flow {correlation_id} is not approved"
            )));
        }
        flow.status = FlowStatus::new(FlowStatusKind::Completed);
        Ok(())
    }

    async fn order_payment_from_flow(&self, correlation_id: &str) -> Result<Payment, ServiceError> {
        let flow = self.flow(correlation_id)?;
        Ok(Payment {
            gateway: self.code.clone(),
            method: flow.method,
            amount: flow.amount,
            transaction_id: correlation_id.to_string(),
        })
    }

    async fn confirm_result(&self, _cart: &Cart, payment: &Payment) -> Result<(), ServiceError> {
        let mut state = self.write();
        if let Some(flow) = state.flows.get_mut(&payment.transaction_id) {
            flow.confirmed = true;
        }
        Ok(())
    }

    async fn cancel_order_payment(&self, payment: &Payment) -> Result<(), ServiceError> {
        let mut state = self.write();
        if state.fail_on_cancel {
            return Err(ServiceError::Payment("payment cancellation rejected".to_string()));
        }
        if let Some(flow) = state.flows.get_mut(&payment.transaction_id) {
            flow.canceled = true;
            flow.status = FlowStatus::new(FlowStatusKind::Canceled);
        }
        state.canceled_payments.push(payment.transaction_id.clone());
        Ok(())
    }
}
