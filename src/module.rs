//! The module contract: the capability every processing unit implements.
//!
//! Concrete modules (capture devices, signal filters, cloud STT/LLM/TTS
//! clients, persistence) live outside this crate and are consumed purely
//! through [`Module`]; the dispatch core never inspects their internals.

use crate::data::{Data, DataSet};
use crate::error::{Result, TandemError};
use crate::router::Router;
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// Stable identity of a module type in the router registry.
///
/// Dispatch is keyed by this tag, never by runtime type inspection, so a
/// pipeline definition can name its modules declaratively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(&'static str);

impl ModuleId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Per-module-type configuration supplied by the caller at dispatch time.
///
/// Every `Debug + Send + Sync + 'static` type qualifies via the blanket
/// impl; a module recovers its concrete params struct with `require`.
/// Params are immutable for the duration of the call, and the router keeps
/// a snapshot of them in the produced entry's
/// [`ModuleRecord`](crate::data::ModuleRecord).
pub trait ModuleParams: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: fmt::Debug + Send + Sync + 'static> ModuleParams for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn ModuleParams {
    /// Downcasts to the concrete params type a module expects.
    ///
    /// Fails with `InvalidParams` naming the expected type when the caller
    /// supplied something else.
    pub fn require<T: Any>(&self, id: ModuleId) -> Result<&T> {
        self.as_any()
            .downcast_ref::<T>()
            .ok_or(TandemError::InvalidParams {
                id,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Downcasts without an error context, for callers that probe.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Tagged result of one module invocation.
///
/// The router pattern-matches this tag to decide how the history grows; it
/// never falls back to ambient type inspection.
#[derive(Debug)]
pub enum ModuleOutput {
    /// One new result set. The router stamps its execution record and
    /// appends it to the history.
    Single(DataSet),
    /// The module already extended the history itself (typical for
    /// composition and streaming modules). The router stamps only the
    /// newest entry.
    Extended(Data),
}

/// A pluggable processing unit.
///
/// Instances are long-lived and shared across many calls and pipeline runs;
/// the `&self` receiver keeps per-call state out of the instance, so any
/// continuation state must travel through [`Data`] or params. The router is
/// handed in on every call for recursive dispatch; diagnostics go through
/// the ambient `tracing` collector.
pub trait Module: Send + Sync {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &'static str;

    /// Produces exactly one pipeline step's worth of result.
    ///
    /// `data` is the read-only history so far; `callback` names another
    /// module the implementation may delegate auxiliary work to (most
    /// non-streaming modules ignore it).
    fn call(
        &self,
        router: &Router,
        data: &Data,
        params: &dyn ModuleParams,
        callback: Option<ModuleId>,
    ) -> Result<ModuleOutput>;

    /// Explicit streaming capability check.
    ///
    /// `None` (the default) means a streaming dispatch to this module fails
    /// with `StreamingUnsupported`; there is no exception-based fallback.
    fn as_streaming(&self) -> Option<&dyn StreamingModule> {
        None
    }
}

/// Optional streaming capability.
///
/// An implementation repeatedly reads the newest chunk of the relevant
/// input stream (`data.last()?` then the field's `stream`), processes it,
/// and, when `callback` is supplied, pushes partial results downstream
/// via `router.call_module(callback, …, streaming = true, …)` before
/// returning a final summary once input is exhausted.
pub trait StreamingModule: Module {
    fn stream_call(
        &self,
        router: &Router,
        data: &Data,
        params: &dyn ModuleParams,
        callback: Option<ModuleId>,
    ) -> Result<ModuleOutput>;
}

/// Resolves the callback id for a streaming path that structurally requires
/// one, failing with `MissingCallback` before any downstream dispatch.
pub fn require_callback(id: ModuleId, callback: Option<ModuleId>) -> Result<ModuleId> {
    callback.ok_or(TandemError::MissingCallback { id })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAD: ModuleId = ModuleId::new("vad");

    #[derive(Debug, PartialEq)]
    struct VadParams {
        threshold: f32,
    }

    #[test]
    fn module_id_display_and_as_str() {
        assert_eq!(VAD.to_string(), "vad");
        assert_eq!(VAD.as_str(), "vad");
    }

    #[test]
    fn module_id_equality_and_hashing() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(VAD, 1);
        assert_eq!(map.get(&ModuleId::new("vad")), Some(&1));
        assert_ne!(VAD, ModuleId::new("stt"));
    }

    #[test]
    fn module_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&VAD).unwrap();
        assert_eq!(json, "\"vad\"");
    }

    #[test]
    fn require_returns_concrete_params() {
        let params: Box<dyn ModuleParams> = Box::new(VadParams { threshold: 0.5 });
        let recovered = params.require::<VadParams>(VAD).unwrap();
        assert_eq!(recovered, &VadParams { threshold: 0.5 });
    }

    #[test]
    fn require_reports_expected_type_on_mismatch() {
        let params: Box<dyn ModuleParams> = Box::new("not vad params");
        let err = params.require::<VadParams>(VAD).unwrap_err();
        match err {
            TandemError::InvalidParams { id, expected } => {
                assert_eq!(id, VAD);
                assert!(expected.contains("VadParams"));
            }
            other => panic!("expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn downcast_ref_probes_without_error() {
        let params: Box<dyn ModuleParams> = Box::new(VadParams { threshold: 0.1 });
        assert!(params.downcast_ref::<VadParams>().is_some());
        assert!(params.downcast_ref::<String>().is_none());
    }

    #[test]
    fn require_callback_passes_through_some() {
        let cb = require_callback(VAD, Some(ModuleId::new("sink"))).unwrap();
        assert_eq!(cb.as_str(), "sink");
    }

    #[test]
    fn require_callback_fails_fast_on_none() {
        let err = require_callback(VAD, None).unwrap_err();
        assert!(matches!(err, TandemError::MissingCallback { id } if id == VAD));
    }
}
