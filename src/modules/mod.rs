//! Built-in modules: sequential composition and diagnostics.
//!
//! Everything domain-specific (capture, VAD, STT, LLM, TTS, persistence)
//! lives outside this crate; the modules here only compose and inspect.

pub mod print;
pub mod root;
pub mod serial;

pub use print::PrintModule;
pub use root::RootModule;
pub use serial::{SerialModule, SerialParams, Step};
