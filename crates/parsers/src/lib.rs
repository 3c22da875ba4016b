pub mod correlate;
pub mod discover;
pub mod jsonl;

mod claude_code;
mod codex;
pub(crate) mod common;
pub(crate) mod fields;
mod pi;

pub use claude_code::ClaudeCodeSchema;
pub use codex::CodexSchema;
pub use correlate::{CorrelatedEvents, Correlator, PendingCalls, Rule, Scope, correlate, process};
pub use pi::PiSchema;

use sessdiag_core::TextLayout;
use sessdiag_core::format::CallFormat;
use serde_json::Value;
use std::path::Path;

/// Number of leading records inspected by [`detect_schema`].
pub const DETECT_WINDOW: usize = 32;

/// Per-schema knobs consumed by the shared extractors.
#[derive(Debug)]
pub struct SchemaProfile {
    pub call_format: &'static CallFormat,
    /// User messages starting with one of these are boilerplate.
    pub suppressed_prefixes: &'static [&'static str],
    /// Drop user text that is nothing but synthetic markup.
    pub strips_markup: bool,
    /// Keep non-mapping call arguments as opaque text instead of `{}`.
    pub opaque_args: bool,
    /// Layout of assistant turn text.
    pub assistant_layout: TextLayout,
    pub call_id_keys: &'static [&'static str],
    pub result_id_keys: &'static [&'static str],
}

/// A transcript dialect: how to recognize it and how to classify its records.
pub trait TranscriptSchema: Send + Sync {
    /// Schema name (e.g. "claude", "codex")
    fn name(&self) -> &'static str;

    /// Check whether a transcript path belongs to this schema
    fn can_parse(&self, path: &Path) -> bool;

    /// Check whether a single record is characteristic of this schema
    fn recognizes(&self, record: &Value) -> bool;

    /// Ordered classification rules; the first match wins
    fn rules(&self) -> &'static [Rule];

    fn profile(&self) -> &'static SchemaProfile;
}

/// Get all available schemas
pub fn all_schemas() -> Vec<Box<dyn TranscriptSchema>> {
    vec![
        Box::new(ClaudeCodeSchema),
        Box::new(CodexSchema),
        Box::new(PiSchema),
    ]
}

/// Look up a schema by name. `claude-code` is accepted as an alias.
pub fn schema_by_name(name: &str) -> Option<Box<dyn TranscriptSchema>> {
    let name = match name.trim().to_ascii_lowercase().as_str() {
        "claude-code" => "claude".to_string(),
        other => other.to_string(),
    };
    all_schemas().into_iter().find(|schema| schema.name() == name)
}

/// Schema whose path conventions match `path`.
pub fn schema_for_path(path: &Path) -> Option<Box<dyn TranscriptSchema>> {
    all_schemas()
        .into_iter()
        .find(|schema| schema.can_parse(path))
}

/// Infer the schema from record content.
///
/// Looks at up to [`DETECT_WINDOW`] records; for each, Codex and Pi are
/// asked before Claude since Claude's markers are the least specific.
/// Defaults to Claude.
pub fn detect_schema(records: &[Value]) -> Box<dyn TranscriptSchema> {
    let mut candidates: Vec<Box<dyn TranscriptSchema>> = vec![
        Box::new(CodexSchema),
        Box::new(PiSchema),
        Box::new(ClaudeCodeSchema),
    ];
    for record in records.iter().take(DETECT_WINDOW) {
        if let Some(idx) = candidates
            .iter()
            .position(|schema| schema.recognizes(record))
        {
            let picked = candidates.swap_remove(idx);
            tracing::debug!("Detected {} transcript", picked.name());
            return picked;
        }
    }
    Box::new(ClaudeCodeSchema)
}

pub(crate) fn has_jsonl_ext(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}
