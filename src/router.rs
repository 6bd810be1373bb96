//! Registry-based dispatch engine.
//!
//! The router owns the only shared state in the core: a mapping from module
//! identity to exactly one long-lived instance, populated at startup and
//! read-only afterward. Every pipeline step re-enters
//! [`Router::call_module`], which dispatches, stamps execution metadata on
//! the produced entry, and returns the extended history.

use crate::data::{Data, ModuleRecord};
use crate::error::{Result, TandemError};
use crate::module::{Module, ModuleId, ModuleOutput, ModuleParams};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Logging preferences for the router.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Log every dispatch's parameter snapshot at info level.
    pub log_params: bool,
    /// Log every dispatch's elapsed duration at info level.
    pub log_timing: bool,
}

/// Dispatch engine for module invocations.
///
/// Dispatch is a plain synchronous call: no retry, no timeout, no catching.
/// A failure raised inside a module propagates unchanged to the router's
/// caller. Streaming delegation is bounded recursive dispatch: a
/// nested callback runs to completion before the invoking module resumes.
pub struct Router {
    modules: HashMap<ModuleId, Box<dyn Module>>,
    options: RouterOptions,
}

impl Router {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            modules: HashMap::new(),
            options,
        }
    }

    /// Registers one instance per module identity.
    ///
    /// Registration is startup-time and fail-stop: a duplicate identity
    /// fails with `DuplicateModule`, leaving entries registered before the
    /// duplicate in place.
    pub fn add_modules<I>(&mut self, modules: I) -> Result<()>
    where
        I: IntoIterator<Item = (ModuleId, Box<dyn Module>)>,
    {
        for (id, instance) in modules {
            if self.modules.contains_key(&id) {
                return Err(TandemError::DuplicateModule { id });
            }
            debug!(module = %id, name = instance.name(), "registered module");
            self.modules.insert(id, instance);
        }
        Ok(())
    }

    pub fn is_registered(&self, id: ModuleId) -> bool {
        self.modules.contains_key(&id)
    }

    /// Dispatches one module invocation and returns the extended history.
    ///
    /// Looks up `id` (failing with `UnregisteredModule`, input untouched),
    /// invokes `call` (or, when `streaming` is set, `stream_call` after an
    /// explicit capability check) and interprets the tagged result:
    ///
    /// - [`ModuleOutput::Single`]: the record is stamped onto the new entry
    ///   and it is appended to (a copy of) the input history.
    /// - [`ModuleOutput::Extended`]: the module already appended its own
    ///   result; only the newest entry is stamped.
    ///
    /// The input `data` is never mutated; callers must continue with the
    /// returned value.
    pub fn call_module(
        &self,
        id: ModuleId,
        data: &Data,
        params: Arc<dyn ModuleParams>,
        streaming: bool,
        callback: Option<ModuleId>,
    ) -> Result<Data> {
        let instance = self
            .modules
            .get(&id)
            .ok_or(TandemError::UnregisteredModule { id })?;

        debug!(
            module = %id,
            streaming,
            callback = callback.map(|c| c.as_str()),
            "dispatching"
        );
        if self.options.log_params {
            info!(module = %id, params = ?params, "dispatch parameters");
        }

        let started = Instant::now();
        let output = if streaming {
            let streaming_impl = instance
                .as_streaming()
                .ok_or(TandemError::StreamingUnsupported { id })?;
            streaming_impl.stream_call(self, data, params.as_ref(), callback)?
        } else {
            instance.call(self, data, params.as_ref(), callback)?
        };
        let elapsed = started.elapsed();

        let record = ModuleRecord {
            module: id,
            params,
            streaming,
            callback,
            elapsed,
        };

        let result = match output {
            ModuleOutput::Single(dataset) => {
                let mut extended = data.clone();
                extended.push(dataset);
                extended.stamp_last(record)?;
                extended
            }
            ModuleOutput::Extended(mut extended) => {
                // A module may legitimately return an empty history (e.g. a
                // composition with zero steps); there is nothing to stamp.
                if !extended.is_empty() {
                    extended.stamp_last(record)?;
                }
                extended
            }
        };

        if self.options.log_timing {
            info!(
                module = %id,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                streaming,
                "dispatch finished"
            );
        } else {
            debug!(module = %id, ?elapsed, "dispatch finished");
        }

        Ok(result)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
