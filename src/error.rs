//! Error types for tandem.

use crate::module::ModuleId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TandemError {
    // Registry errors
    #[error("Module {id} is not registered with the router")]
    UnregisteredModule { id: ModuleId },

    #[error("Module {id} is already registered with the router")]
    DuplicateModule { id: ModuleId },

    // Dispatch errors
    #[error("Module {id} does not implement streaming calls")]
    StreamingUnsupported { id: ModuleId },

    #[error("Streaming call to module {id} requires a callback module")]
    MissingCallback { id: ModuleId },

    #[error("Module {id} received parameters of the wrong type (expected {expected})")]
    InvalidParams {
        id: ModuleId,
        expected: &'static str,
    },

    // History errors
    #[error("Pipeline history is empty")]
    EmptyHistory,

    // Failures raised inside a module's own logic. The router never wraps
    // these; they reach its caller unchanged.
    #[error(transparent)]
    Module(#[from] anyhow::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TandemError>;
