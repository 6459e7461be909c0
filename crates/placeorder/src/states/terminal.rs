use async_trait::async_trait;

use crate::process::Process;
use crate::state::StateName;

use super::{RunResult, State};

/// `Success`, `Failed` or `Canceled`. Running it changes nothing.
pub(super) struct Terminal {
    name: StateName,
}

impl Terminal {
    pub(super) fn new(name: StateName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl State for Terminal {
    fn name(&self) -> StateName {
        self.name
    }

    fn is_final(&self) -> bool {
        true
    }

    async fn run(&self, _process: &mut Process) -> RunResult {
        RunResult::proceed()
    }
}
