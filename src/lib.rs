//! tandem - typed pipeline-execution engine
//!
//! Dispatches work to pluggable processing modules, threading one growing,
//! append-only history of typed results through them. Pipelines are
//! composed declaratively, as an ordered list of module identity + params +
//! optional callback, so a multimodal chain (capture → VAD → STT → LLM →
//! TTS) is assembled without touching the dispatcher.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod data;
pub mod error;
pub mod module;
pub mod modules;
pub mod router;

// Core contract
pub use module::{Module, ModuleId, ModuleOutput, ModuleParams, StreamingModule, require_callback};

// Pipeline history
pub use data::{Data, DataField, DataSet, DataStream, ModuleRecord};

// Dispatch
pub use router::{Router, RouterOptions};

// Built-in modules
pub use modules::{PrintModule, RootModule, SerialModule, SerialParams, Step};

// Error handling
pub use error::{Result, TandemError};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
