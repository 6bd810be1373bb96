//! History inspection module.

use crate::data::{Data, DataField, DataSet};
use crate::error::Result;
use crate::module::{Module, ModuleId, ModuleOutput, ModuleParams, StreamingModule};
use crate::router::Router;
use serde_json::json;
use tracing::info;

/// Logs the newest entry's populated slots through the diagnostics sink and
/// appends a small echo entry describing what it saw.
///
/// Useful as a step while wiring up a new composition, and as a callback
/// target for streaming modules: the streaming path logs the newest text
/// chunk as it arrives. Ignores its params.
pub struct PrintModule;

impl PrintModule {
    pub const ID: ModuleId = ModuleId::new("print");
}

impl Module for PrintModule {
    fn name(&self) -> &'static str {
        Self::ID.as_str()
    }

    fn call(
        &self,
        _router: &Router,
        data: &Data,
        _params: &dyn ModuleParams,
        _callback: Option<ModuleId>,
    ) -> Result<ModuleOutput> {
        let last = data.last()?;
        let entry = data.len() - 1;
        let mut printed = Vec::new();

        if let Some(text) = &last.text {
            info!(entry, text = %text.main(), "text slot");
            printed.push("text");
        }
        if let Some(audio) = &last.audio {
            info!(
                entry,
                bytes = audio.main().len(),
                chunks = audio.stream().map(|s| s.len()),
                "audio slot"
            );
            printed.push("audio");
        }
        if let Some(flag) = &last.flag {
            info!(entry, flag = *flag.main(), "flag slot");
            printed.push("flag");
        }
        if let Some(meta) = &last.meta {
            info!(entry, meta = %meta.main(), "meta slot");
            printed.push("meta");
        }
        if last.extra.is_some() {
            info!(entry, "opaque extra payload present");
            printed.push("extra");
        }

        let mut echo = DataSet::new();
        echo.text = last.text.clone();
        echo.meta = Some(DataField::new(json!({ "printed": printed })));
        Ok(ModuleOutput::Single(echo))
    }

    fn as_streaming(&self) -> Option<&dyn StreamingModule> {
        Some(self)
    }
}

impl StreamingModule for PrintModule {
    fn stream_call(
        &self,
        _router: &Router,
        data: &Data,
        _params: &dyn ModuleParams,
        _callback: Option<ModuleId>,
    ) -> Result<ModuleOutput> {
        let last = data.last()?;
        let chunk = last.text.as_ref().and_then(|t| t.stream()).and_then(|s| s.last());

        match chunk {
            Some(chunk) => info!(chunk = %chunk, "text chunk"),
            None => info!(dataset = ?last, "newest entry has no text chunk"),
        }

        let mut echo = DataSet::new();
        echo.text = chunk
            .map(|c| DataField::new(c.clone()))
            .or_else(|| last.text.clone());
        Ok(ModuleOutput::Single(echo))
    }
}
