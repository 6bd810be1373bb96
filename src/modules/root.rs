//! Pipeline entry module.

use crate::data::Data;
use crate::error::Result;
use crate::module::{Module, ModuleId, ModuleOutput, ModuleParams};
use crate::modules::serial::{SerialParams, run_steps};
use crate::router::Router;
use std::sync::Arc;
use tracing::debug;

/// The outermost module of a pipeline run.
///
/// Mechanically identical to [`SerialModule`](super::SerialModule); it
/// exists as a distinct identity purely to mark pipeline-entry intent. The
/// host registers it like any other module and invokes it through the
/// router; [`RootModule::run`] wraps that invocation and constructs the
/// initial empty history.
pub struct RootModule;

impl RootModule {
    pub const ID: ModuleId = ModuleId::new("root");

    /// Dispatches a whole pipeline from an empty history.
    pub fn run(router: &Router, params: SerialParams) -> Result<Data> {
        router.call_module(Self::ID, &Data::new(), Arc::new(params), false, None)
    }
}

impl Module for RootModule {
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
        debug!(steps = params.steps.len(), "starting pipeline");
        Ok(ModuleOutput::Extended(run_steps(
            router,
            data,
            &params.steps,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataSet;
    use crate::modules::serial::Step;

    const GREET: ModuleId = ModuleId::new("greet");

    struct GreetModule;

    impl Module for GreetModule {
        fn name(&self) -> &'static str {
            "greet"
        }

        fn call(
            &self,
            _router: &Router,
            _data: &Data,
            _params: &dyn ModuleParams,
            _callback: Option<ModuleId>,
        ) -> Result<ModuleOutput> {
            Ok(ModuleOutput::Single(DataSet::with_text("hello")))
        }
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .add_modules([
                (RootModule::ID, Box::new(RootModule) as Box<dyn Module>),
                (GREET, Box::new(GreetModule) as Box<dyn Module>),
            ])
            .unwrap();
        router
    }

    #[test]
    fn run_starts_from_an_empty_history() {
        let router = router();
        let params = SerialParams::new(vec![Step::new(GREET, Arc::new(()))]);

        let result = RootModule::run(&router, params).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.last().unwrap().text.as_ref().unwrap().main(), "hello");
        // The outermost dispatch owns the newest entry's record.
        assert_eq!(result.last().unwrap().record().unwrap().module, RootModule::ID);
    }

    #[test]
    fn run_with_no_steps_yields_empty_history() {
        let router = router();
        let result = RootModule::run(&router, SerialParams::default()).unwrap();
        assert!(result.is_empty());
    }
}
