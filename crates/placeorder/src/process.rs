//! A place-order attempt bound to the state catalog.

use std::sync::Arc;

use cart::Cart;
use metrics::counter;
use tracing::{debug, warn};

use crate::context::{Context, RollbackReference};
use crate::error::{RollbackError, RollbackFailure};
use crate::failed_reason::FailedReason;
use crate::state::StateName;
use crate::state_data::StateData;
use crate::states::StateCatalog;

/// Runs the states of one context.
///
/// Created by the `ProcessFactory`, either fresh or restored from a stored
/// context. The process itself never persists anything.
pub struct Process {
    context: Context,
    catalog: Arc<StateCatalog>,
}

impl Process {
    pub(crate) fn new(context: Context, catalog: Arc<StateCatalog>) -> Self {
        Self { context, catalog }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    pub fn is_final(&self) -> bool {
        self.context.is_final()
    }

    /// Moves to `name`, replacing the presentation data.
    pub fn update_state(&mut self, name: StateName, data: Option<StateData>) {
        debug!(
            process = %self.context.uuid(),
            from = %self.context.current_state_name(),
            to = %name,
            "State transition"
        );
        self.context.set_state(name, data);
    }

    /// Replaces the cart snapshot.
    pub fn update_cart(&mut self, cart: Cart) {
        self.context.set_cart(cart);
    }

    /// Runs the current state once. A final process is left untouched.
    ///
    /// When the state fails, the process moves to `Failed` and compensates
    /// everything recorded so far.
    pub async fn run(&mut self) {
        if self.is_final() {
            return;
        }

        let from = self.context.current_state_name();
        counter!("placeorder_steps_total", "state" => from.as_str()).increment(1);

        let catalog = Arc::clone(&self.catalog);
        let result = catalog.get(from).run(self).await;

        if let Some(data) = result.rollback_data {
            self.context
                .push_rollback(RollbackReference { state: from, data });
        }
        if let Some(reason) = result.failed {
            self.fail(from, reason).await;
        }
    }

    async fn fail(&mut self, state: StateName, reason: FailedReason) {
        warn!(
            process = %self.context.uuid(),
            state = %state,
            reason = %reason,
            "Place order failed"
        );
        counter!("placeorder_failed_total", "reason" => reason.kind()).increment(1);
        self.context.set_failed(reason);

        if let Err(e) = self.rollback().await {
            warn!(
                process = %self.context.uuid(),
                error = %e,
                "Compensation after failure incomplete"
            );
        }
    }

    /// Compensates every recorded effect, newest first.
    ///
    /// Keeps going past failing compensations and reports all of them.
    pub async fn rollback(&self) -> Result<(), RollbackError> {
        let mut failures = Vec::new();

        for reference in self.context.rollback_references().iter().rev() {
            debug!(
                process = %self.context.uuid(),
                state = %reference.state,
                kind = reference.data.kind(),
                "Compensating"
            );
            if let Err(error) = self
                .catalog
                .get(reference.state)
                .rollback(&reference.data)
                .await
            {
                warn!(
                    process = %self.context.uuid(),
                    state = %reference.state,
                    error = %error,
                    "Compensation failed"
                );
                failures.push(RollbackFailure {
                    state: reference.state,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RollbackError { failures })
        }
    }

    /// Moves the process to `Canceled`.
    pub fn cancel(&mut self) {
        self.update_state(StateName::Canceled, None);
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
