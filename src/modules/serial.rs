//! Sequential composition of module invocations.

use crate::data::Data;
use crate::error::Result;
use crate::module::{Module, ModuleId, ModuleOutput, ModuleParams};
use crate::router::Router;
use std::sync::Arc;
use tracing::debug;

/// One step of a serial pipeline: target module identity, its parameters,
/// and an optional callback module for streaming delegation.
#[derive(Debug, Clone)]
pub struct Step {
    pub module: ModuleId,
    pub params: Arc<dyn ModuleParams>,
    pub callback: Option<ModuleId>,
}

impl Step {
    pub fn new(module: ModuleId, params: Arc<dyn ModuleParams>) -> Self {
        Self {
            module,
            params,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: ModuleId) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Parameters for [`SerialModule`] and [`RootModule`](super::RootModule):
/// the ordered step list.
#[derive(Debug, Clone, Default)]
pub struct SerialParams {
    pub steps: Vec<Step>,
}

impl SerialParams {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

/// Runs `steps` strictly in order, threading the returned history of step
/// *i* into step *i+1*. Fail-fast: the first failing step aborts the rest,
/// and effects of completed steps are not rolled back.
pub(crate) fn run_steps(router: &Router, data: &Data, steps: &[Step]) -> Result<Data> {
    let mut current = data.clone();
    for (index, step) in steps.iter().enumerate() {
        debug!(step = index, module = %step.module, "running step");
        current = router.call_module(
            step.module,
            &current,
            Arc::clone(&step.params),
            false,
            step.callback,
        )?;
    }
    Ok(current)
}

/// Executes an ordered list of steps through the router.
///
/// Step *i+1* never begins before step *i*'s dispatch has fully returned;
/// composition is strictly sequential, with no concurrent branches.
pub struct SerialModule;

impl SerialModule {
    pub const ID: ModuleId = ModuleId::new("serial");
}

impl Module for SerialModule {
    fn name(&self) -> &'static str {
        Self::ID.as_str()
    }

    fn call(
        &self,
        router: &Router,
        data: &Data,
        params: &dyn ModuleParams,
        _callback: Option<ModuleId>,
    ) -> Result<ModuleOutput> {
        let params = params.require::<SerialParams>(Self::ID)?;
        Ok(ModuleOutput::Extended(run_steps(
            router,
            data,
            &params.steps,
        )?))
    }
}
