//! Command-level entry point used by transport adapters.

use std::sync::Arc;

use common::ProcessId;
use context_store::ContextStore;
use lock::Locker;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::coordinator::Coordinator;
use crate::error::{PlaceOrderError, Result};
use crate::failed_reason::FailedReason;
use crate::services::CartService;
use crate::state::StateName;
use crate::state_data::StateData;

/// Commands accepted by the [`PlaceOrderHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum PlaceOrderCommand {
    /// Start placing the current cart of the key.
    Start { return_url: String },
    /// Advance by one state.
    Refresh,
    /// Advance until the process settles.
    RefreshBlocking,
    Cancel,
    Clear,
    Current,
}

/// Result of a [`PlaceOrderCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlaceOrderOutcome {
    Started { uuid: ProcessId },
    Info(PlaceOrderInfo),
    Canceled { canceled: bool },
    Cleared { cleared: bool },
}

/// What a caller gets to see of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceOrderInfo {
    pub uuid: ProcessId,
    pub state: StateName,
    pub state_data: Option<StateData>,
    pub failed_reason: Option<FailedReason>,
    /// Set when a blocking refresh ran out of time before the process settled.
    pub timed_out: bool,
}

impl From<&Context> for PlaceOrderInfo {
    fn from(ctx: &Context) -> Self {
        Self {
            uuid: ctx.uuid(),
            state: ctx.current_state_name(),
            state_data: ctx.current_state_data().cloned(),
            failed_reason: ctx.failed_reason().cloned(),
            timed_out: false,
        }
    }
}

/// Maps place-order commands onto the coordinator.
pub struct PlaceOrderHandler<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    coordinator: Arc<Coordinator<S, L>>,
    carts: Arc<dyn CartService>,
}

impl<S, L> Clone for PlaceOrderHandler<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            carts: Arc::clone(&self.carts),
        }
    }
}

impl<S, L> PlaceOrderHandler<S, L>
where
    S: ContextStore<Context>,
    L: Locker,
{
    /// Creates a handler loading carts from `carts`.
    pub fn new(coordinator: Arc<Coordinator<S, L>>, carts: Arc<dyn CartService>) -> Self {
        Self { coordinator, carts }
    }

    pub fn coordinator(&self) -> &Coordinator<S, L> {
        &self.coordinator
    }

    /// Executes `command` for `key`.
    pub async fn handle(&self, key: &str, command: PlaceOrderCommand) -> Result<PlaceOrderOutcome> {
        Ok(match command {
            PlaceOrderCommand::Start { return_url } => PlaceOrderOutcome::Started {
                uuid: self.start_place_order(key, &return_url).await?,
            },
            PlaceOrderCommand::Refresh => PlaceOrderOutcome::Info(self.refresh(key).await?),
            PlaceOrderCommand::RefreshBlocking => {
                PlaceOrderOutcome::Info(self.refresh_blocking(key).await?)
            }
            PlaceOrderCommand::Cancel => PlaceOrderOutcome::Canceled {
                canceled: self.cancel(key).await?,
            },
            PlaceOrderCommand::Clear => PlaceOrderOutcome::Cleared {
                cleared: self.clear(key).await?,
            },
            PlaceOrderCommand::Current => PlaceOrderOutcome::Info(self.current(key).await?),
        })
    }

    /// Starts placing the current cart of `key`.
    pub async fn start_place_order(&self, key: &str, return_url: &str) -> Result<ProcessId> {
        let cart = self.carts.current_cart(key).await?;
        let context = self.coordinator.start(key, cart, return_url).await?;
        Ok(context.uuid())
    }

    /// Advances the process by one state and reports where it is.
    pub async fn refresh(&self, key: &str) -> Result<PlaceOrderInfo> {
        self.coordinator.run(key).await?;
        self.current(key).await
    }

    /// Advances the process until it settles.
    ///
    /// Running out of time still yields the last stored state, flagged with
    /// `timed_out` so the caller knows to refresh again.
    pub async fn refresh_blocking(&self, key: &str) -> Result<PlaceOrderInfo> {
        let timeout = self.coordinator.config().blocking_timeout;
        match self.coordinator.run_blocking(key, timeout).await {
            Ok(ctx) => Ok(PlaceOrderInfo::from(&ctx)),
            Err(PlaceOrderError::Timeout(ctx)) => Ok(PlaceOrderInfo {
                timed_out: true,
                ..PlaceOrderInfo::from(ctx.as_ref())
            }),
            Err(e) => Err(e),
        }
    }

    /// Cancels the process. Returns false if there was nothing to cancel.
    ///
    /// Failed compensations are logged; the process is canceled regardless.
    pub async fn cancel(&self, key: &str) -> Result<bool> {
        match self.coordinator.cancel(key).await {
            Ok(_) => Ok(true),
            Err(PlaceOrderError::Rollback(e)) => {
                tracing::warn!(key = %key, error = %e, "Canceled with incomplete rollback");
                Ok(true)
            }
            Err(PlaceOrderError::NoProcess | PlaceOrderError::AlreadyFinal) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Removes the process. Returns false if there was none.
    pub async fn clear(&self, key: &str) -> Result<bool> {
        match self.coordinator.clear(key).await {
            Ok(()) => Ok(true),
            Err(PlaceOrderError::NoProcess) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn current(&self, key: &str) -> Result<PlaceOrderInfo> {
        let ctx = self.coordinator.current(key).await?;
        Ok(PlaceOrderInfo::from(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaceOrderConfig;
    use crate::testing::{Fixture, paid_cart};
    use context_store::InMemoryContextStore;
    use lock::InMemoryLocker;
    use std::time::Duration;

    type TestHandler = PlaceOrderHandler<InMemoryContextStore<Context>, InMemoryLocker>;

    fn handler(fixture: &Fixture) -> TestHandler {
        handler_with_config(fixture, PlaceOrderConfig::default())
    }

    fn handler_with_config(fixture: &Fixture, config: PlaceOrderConfig) -> TestHandler {
        let coordinator = Coordinator::new(
            InMemoryContextStore::new(),
            InMemoryLocker::new(),
            fixture.factory(),
            config,
        );
        PlaceOrderHandler::new(Arc::new(coordinator), Arc::new(fixture.carts.clone()))
    }

    #[tokio::test]
    async fn test_start_uses_current_cart() {
        let fixture = Fixture::new();
        fixture.carts.put_cart(paid_cart("completed"));
        let handler = handler(&fixture);

        let uuid = handler
            .start_place_order("cart-1", "/return")
            .await
            .unwrap();
        let info = handler.current("cart-1").await.unwrap();
        assert_eq!(info.uuid, uuid);
        assert_eq!(info.state, StateName::New);

        assert!(matches!(
            handler.start_place_order("unknown", "/return").await,
            Err(PlaceOrderError::Service(_))
        ));
    }

    #[tokio::test]
    async fn test_commands_through_handle() {
        let fixture = Fixture::new();
        fixture.carts.put_cart(paid_cart("redirect"));
        let handler = handler(&fixture);

        let started = handler
            .handle(
                "cart-1",
                PlaceOrderCommand::Start {
                    return_url: "/return".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(started, PlaceOrderOutcome::Started { .. }));

        let PlaceOrderOutcome::Info(info) = handler
            .handle("cart-1", PlaceOrderCommand::RefreshBlocking)
            .await
            .unwrap()
        else {
            panic!("expected info");
        };
        assert_eq!(info.state, StateName::Redirect);
        assert_eq!(
            info.state_data,
            Some(StateData::Redirect {
                url: "https://psp.example/pay".to_string()
            })
        );

        assert_eq!(
            handler
                .handle("cart-1", PlaceOrderCommand::Cancel)
                .await
                .unwrap(),
            PlaceOrderOutcome::Canceled { canceled: true }
        );
        assert_eq!(
            handler
                .handle("cart-1", PlaceOrderCommand::Cancel)
                .await
                .unwrap(),
            PlaceOrderOutcome::Canceled { canceled: false }
        );
        assert_eq!(
            handler
                .handle("cart-1", PlaceOrderCommand::Clear)
                .await
                .unwrap(),
            PlaceOrderOutcome::Cleared { cleared: true }
        );
        assert_eq!(
            handler
                .handle("cart-1", PlaceOrderCommand::Clear)
                .await
                .unwrap(),
            PlaceOrderOutcome::Cleared { cleared: false }
        );
    }

    #[tokio::test]
    async fn test_refresh_blocking_flags_timeout() {
        let fixture = Fixture::new();
        fixture.carts.put_cart(paid_cart("completed"));

        let settled = handler(&fixture);
        settled.start_place_order("cart-1", "/return").await.unwrap();
        let info = settled.refresh_blocking("cart-1").await.unwrap();
        assert_eq!(info.state, StateName::Success);
        assert!(!info.timed_out);

        let hurried = handler_with_config(
            &fixture,
            PlaceOrderConfig {
                blocking_timeout: Duration::ZERO,
                ..PlaceOrderConfig::default()
            },
        );
        hurried.start_place_order("cart-1", "/return").await.unwrap();
        let info = hurried.refresh_blocking("cart-1").await.unwrap();
        assert_eq!(info.state, StateName::New);
        assert!(info.timed_out);
        assert!(!hurried.current("cart-1").await.unwrap().timed_out);
    }

    #[test]
    fn test_info_serialization() {
        let info = PlaceOrderInfo {
            uuid: ProcessId::new(),
            state: StateName::ShowHtml,
            state_data: Some(StateData::Html {
                html: "<form/>".to_string(),
            }),
            failed_reason: None,
            timed_out: false,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], "ShowHTML");
        assert_eq!(json["state_data"]["kind"], "Html");
        assert!(json["failed_reason"].is_null());
        assert_eq!(json["timed_out"], false);
    }
}
