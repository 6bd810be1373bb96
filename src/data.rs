//! Pipeline history and typed value containers.
//!
//! One [`Data`] value is threaded through every module invocation of a run.
//! Each invocation contributes a single [`DataSet`]; the history is
//! append-only and entries are never rewritten once a later step can see
//! them. The history lives for exactly one run and is dropped afterwards;
//! persistence is a domain module's job, not the core's.

use crate::error::{Result, TandemError};
use crate::module::{ModuleId, ModuleParams};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Append-only ordered sequence of incremental chunks produced by a
/// streaming module.
///
/// Chunks are never removed or reordered; iteration yields them in append
/// order and `last()` is the most recently appended chunk.
#[derive(Debug, Clone, Serialize)]
pub struct DataStream<T> {
    chunks: Vec<T>,
}

impl<T> DataStream<T> {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn push(&mut self, chunk: T) {
        self.chunks.push(chunk);
    }

    /// Most recently appended chunk, if any.
    pub fn last(&self) -> Option<&T> {
        self.chunks.last()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.chunks.iter()
    }
}

impl<T> Default for DataStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for DataStream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a DataStream<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A materialized value plus the optional chunk stream it was built from.
///
/// When a stream is present and `T` is concatenable, concatenating all
/// chunks reconstructs `main`; `from_byte_chunks` upholds that by
/// construction for byte fields. Immutable once a module hands it over.
#[derive(Debug, Clone, Serialize)]
pub struct DataField<T> {
    main: T,
    stream: Option<DataStream<T>>,
}

impl<T> DataField<T> {
    pub fn new(main: T) -> Self {
        Self { main, stream: None }
    }

    pub fn with_stream(main: T, stream: DataStream<T>) -> Self {
        Self {
            main,
            stream: Some(stream),
        }
    }

    pub fn main(&self) -> &T {
        &self.main
    }

    pub fn into_main(self) -> T {
        self.main
    }

    pub fn stream(&self) -> Option<&DataStream<T>> {
        self.stream.as_ref()
    }
}

impl DataField<Vec<u8>> {
    /// Builds a byte field whose `main` is the concatenation of `chunks`,
    /// in chunk order.
    pub fn from_byte_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let stream: DataStream<Vec<u8>> = chunks.into_iter().collect();
        let main: Vec<u8> = stream.iter().flatten().copied().collect();
        Self {
            main,
            stream: Some(stream),
        }
    }
}

impl DataField<String> {
    /// Builds a text field whose `main` is the concatenation of `chunks`,
    /// in chunk order.
    pub fn from_text_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let stream: DataStream<String> = chunks.into_iter().collect();
        let main: String = stream.iter().map(String::as_str).collect();
        Self {
            main,
            stream: Some(stream),
        }
    }
}

/// Execution metadata stamped by the router after a module call returns.
///
/// Modules never write this themselves.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Identity the dispatch was requested under.
    pub module: ModuleId,
    /// Snapshot of the parameters the module was called with.
    pub params: Arc<dyn ModuleParams>,
    /// Whether this was a streaming dispatch.
    pub streaming: bool,
    /// Callback module designated for the dispatch, if any.
    pub callback: Option<ModuleId>,
    /// Wall-clock duration of the module call.
    pub elapsed: Duration,
}

/// One module invocation's aggregated typed outputs.
///
/// The slots mirror what multimodal pipelines actually pass around: text,
/// raw audio bytes, a boolean decision (e.g. a VAD speech flag), structured
/// metadata, and an opaque catch-all for module-specific payloads (a raw
/// API response, a device handle's stats, …).
#[derive(Clone, Default)]
pub struct DataSet {
    pub text: Option<DataField<String>>,
    pub audio: Option<DataField<Vec<u8>>>,
    pub flag: Option<DataField<bool>>,
    pub meta: Option<DataField<serde_json::Value>>,
    pub extra: Option<Arc<dyn Any + Send + Sync>>,
    record: Option<ModuleRecord>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common text-only result.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(DataField::new(text.into())),
            ..Self::default()
        }
    }

    /// Execution metadata, present once the router has dispatched this
    /// entry.
    pub fn record(&self) -> Option<&ModuleRecord> {
        self.record.as_ref()
    }

    pub(crate) fn set_record(&mut self, record: ModuleRecord) {
        self.record = Some(record);
    }
}

impl fmt::Debug for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSet")
            .field("text", &self.text)
            // Audio bytes are elided; their length is what matters in logs.
            .field("audio_len", &self.audio.as_ref().map(|a| a.main().len()))
            .field("flag", &self.flag)
            .field("meta", &self.meta)
            .field("has_extra", &self.extra.is_some())
            .field("record", &self.record)
            .finish()
    }
}

/// Append-only ordered history of the results produced so far in a run.
///
/// Entries are shared (`Arc`) so cloning the history is cheap; the router
/// hands each module a read-only view and returns the extended value, so
/// callers must always use the returned history rather than assume their
/// input was mutated.
#[derive(Debug, Clone, Default)]
pub struct Data {
    entries: Vec<Arc<DataSet>>,
}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry. Appended entries are never mutated or removed.
    pub fn push(&mut self, dataset: DataSet) {
        self.entries.push(Arc::new(dataset));
    }

    pub fn get(&self, index: usize) -> Option<&DataSet> {
        self.entries.get(index).map(Arc::as_ref)
    }

    /// Most recent entry. Fails on an empty history.
    pub fn last(&self) -> Result<&DataSet> {
        self.entries
            .last()
            .map(Arc::as_ref)
            .ok_or(TandemError::EmptyHistory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSet> {
        self.entries.iter().map(Arc::as_ref)
    }

    /// Stamps the newest entry's execution record. Router-only; the
    /// outermost dispatch owns the newest entry's record.
    pub(crate) fn stamp_last(&mut self, record: ModuleRecord) -> Result<()> {
        let last = self.entries.last_mut().ok_or(TandemError::EmptyHistory)?;
        Arc::make_mut(last).set_record(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_for(id: &'static str) -> ModuleRecord {
        ModuleRecord {
            module: ModuleId::new(id),
            params: Arc::new(()),
            streaming: false,
            callback: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn stream_preserves_append_order() {
        let mut stream = DataStream::new();
        stream.push("c1");
        stream.push("c2");
        stream.push("c3");

        assert_eq!(stream.last(), Some(&"c3"));
        assert_eq!(stream.len(), 3);
        let collected: Vec<_> = stream.iter().copied().collect();
        assert_eq!(collected, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn empty_stream_has_no_last() {
        let stream: DataStream<u8> = DataStream::new();
        assert!(stream.last().is_none());
        assert!(stream.is_empty());
    }

    #[test]
    fn stream_ref_into_iterator() {
        let stream: DataStream<i32> = [1, 2, 3].into_iter().collect();
        let doubled: Vec<i32> = (&stream).into_iter().map(|n| n * 2).collect();
        assert_eq!(doubled, vec![2, 4, 6]);
    }

    #[test]
    fn byte_field_main_is_chunk_concatenation() {
        let field = DataField::from_byte_chunks([vec![1u8, 2], vec![3], vec![4, 5]]);
        assert_eq!(field.main(), &vec![1u8, 2, 3, 4, 5]);

        let stream = field.stream().unwrap();
        assert_eq!(stream.len(), 3);
        let rebuilt: Vec<u8> = stream.iter().flatten().copied().collect();
        assert_eq!(&rebuilt, field.main());
    }

    #[test]
    fn text_field_main_is_chunk_concatenation() {
        let field =
            DataField::from_text_chunks(["Hello".to_string(), ", ".to_string(), "pipeline".into()]);
        assert_eq!(field.main(), "Hello, pipeline");
        assert_eq!(field.stream().unwrap().last(), Some(&"pipeline".to_string()));
    }

    #[test]
    fn plain_field_has_no_stream() {
        let field = DataField::new(42);
        assert_eq!(field.main(), &42);
        assert!(field.stream().is_none());
        assert_eq!(field.into_main(), 42);
    }

    #[test]
    fn dataset_with_text_populates_only_text() {
        let ds = DataSet::with_text("hi");
        assert_eq!(ds.text.as_ref().map(|t| t.main().as_str()), Some("hi"));
        assert!(ds.audio.is_none());
        assert!(ds.flag.is_none());
        assert!(ds.meta.is_none());
        assert!(ds.extra.is_none());
        assert!(ds.record().is_none());
    }

    #[test]
    fn dataset_debug_elides_audio_bytes() {
        let mut ds = DataSet::new();
        ds.audio = Some(DataField::new(vec![0u8; 4096]));
        let debug = format!("{:?}", ds);
        assert!(debug.contains("audio_len"));
        assert!(debug.contains("4096"));
        assert!(!debug.contains("0, 0, 0"));
    }

    #[test]
    fn data_last_fails_on_empty_history() {
        let data = Data::new();
        assert!(matches!(data.last(), Err(TandemError::EmptyHistory)));
    }

    #[test]
    fn data_last_is_idempotent() {
        let mut data = Data::new();
        data.push(DataSet::with_text("a"));
        data.push(DataSet::with_text("b"));

        let first = data.last().unwrap().text.as_ref().unwrap().main().clone();
        let second = data.last().unwrap().text.as_ref().unwrap().main().clone();
        assert_eq!(first, "b");
        assert_eq!(first, second);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn data_iterates_in_append_order() {
        let mut data = Data::new();
        for text in ["one", "two", "three"] {
            data.push(DataSet::with_text(text));
        }

        let texts: Vec<_> = data
            .iter()
            .map(|ds| ds.text.as_ref().unwrap().main().clone())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(data.get(1).unwrap().text.as_ref().unwrap().main(), "two");
        assert!(data.get(3).is_none());
    }

    #[test]
    fn clone_shares_entries_without_copying() {
        let mut data = Data::new();
        data.push(DataSet::with_text("shared"));

        let copy = data.clone();
        data.push(DataSet::with_text("only in original"));

        assert_eq!(copy.len(), 1);
        assert_eq!(data.len(), 2);
        assert_eq!(copy.last().unwrap().text.as_ref().unwrap().main(), "shared");
    }

    #[test]
    fn stamp_last_writes_record_on_newest_entry_only() {
        let mut data = Data::new();
        data.push(DataSet::with_text("a"));
        data.push(DataSet::with_text("b"));

        data.stamp_last(record_for("stt")).unwrap();

        assert!(data.get(0).unwrap().record().is_none());
        let record = data.last().unwrap().record().unwrap();
        assert_eq!(record.module, ModuleId::new("stt"));
        assert!(!record.streaming);
    }

    #[test]
    fn stamp_last_fails_on_empty_history() {
        let mut data = Data::new();
        assert!(matches!(
            data.stamp_last(record_for("stt")),
            Err(TandemError::EmptyHistory)
        ));
    }

    #[test]
    fn stamp_last_does_not_leak_into_clones() {
        let mut data = Data::new();
        data.push(DataSet::with_text("a"));
        let snapshot = data.clone();

        data.stamp_last(record_for("stt")).unwrap();

        // Copy-on-write: the pre-stamp snapshot stays unstamped.
        assert!(snapshot.last().unwrap().record().is_none());
        assert!(data.last().unwrap().record().is_some());
    }
}
