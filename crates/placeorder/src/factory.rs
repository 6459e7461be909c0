//! Creation and restoration of processes.

use std::sync::Arc;

use cart::Cart;
use common::ProcessId;

use crate::context::Context;
use crate::process::Process;
use crate::state::StateName;
use crate::states::StateCatalog;

/// Builds processes bound to one state catalog.
#[derive(Clone)]
pub struct ProcessFactory {
    catalog: Arc<StateCatalog>,
    start_state: StateName,
}

impl ProcessFactory {
    /// Creates a factory starting new processes in `New`.
    pub fn new(catalog: StateCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            start_state: StateName::New,
        }
    }

    /// Overrides the state new processes start in.
    pub fn with_start_state(mut self, start_state: StateName) -> Self {
        self.start_state = start_state;
        self
    }

    pub fn start_state(&self) -> StateName {
        self.start_state
    }

    /// A new process with a fresh uuid for `cart`.
    pub fn new_process(&self, return_url: impl Into<String>, cart: Cart) -> Process {
        let context = Context::new(ProcessId::new(), self.start_state, cart, return_url);
        Process::new(context, Arc::clone(&self.catalog))
    }

    /// Rebuilds the process of a stored context.
    pub fn restore(&self, context: Context) -> Process {
        Process::new(context, Arc::clone(&self.catalog))
    }
}
