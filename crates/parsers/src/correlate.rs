//! Rule-table dispatch and tool-call correlation.
//!
//! A [`Correlator`] owns the only cross-record state of a pass: the table of
//! tool calls still waiting for their result. Records are fed one at a time
//! through the schema's rule table; the first rule whose predicate matches
//! extracts zero or more [`DiagEvent`]s.

use crate::{SchemaProfile, TranscriptSchema};
use sessdiag_core::config::TruncationLimits;
use sessdiag_core::event::PLACEHOLDER_TOOL;
use sessdiag_core::format::{ToolArgs, format_call};
use sessdiag_core::markup::clean;
use sessdiag_core::{DiagEvent, ToolCallRef};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// One classification rule: the first rule whose `matches` holds handles the
/// record.
pub struct Rule {
    pub label: &'static str,
    pub matches: fn(&Value) -> bool,
    pub extract: fn(&mut Scope<'_>, &Value),
}

/// Extractor for records that carry nothing worth showing.
pub(crate) fn skip(_scope: &mut Scope<'_>, _record: &Value) {}

/// Calls seen so far whose result has not arrived, keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: HashMap<String, String>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call. A repeated id replaces the earlier entry.
    pub fn insert(&mut self, id: String, name: String) {
        if let Some(previous) = self.calls.insert(id.clone(), name) {
            tracing::debug!("Call id {} reused, replacing pending {}", id, previous);
        }
    }

    /// Remove and return the tool name for `id`.
    pub fn take(&mut self, id: &str) -> Option<String> {
        self.calls.remove(id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// What an extractor can touch while handling one record.
pub struct Scope<'a> {
    pending: &'a mut PendingCalls,
    events: &'a mut Vec<DiagEvent>,
    profile: &'static SchemaProfile,
}

impl Scope<'_> {
    pub fn profile(&self) -> &'static SchemaProfile {
        self.profile
    }

    /// Queue an event; events with nothing to show are dropped here.
    pub fn emit(&mut self, event: DiagEvent) {
        if event.is_empty() {
            tracing::trace!("Suppressing empty event");
            return;
        }
        self.events.push(event);
    }

    /// Emit a user message after the schema's markup and boilerplate filters.
    ///
    /// Text that is nothing but synthetic markup is dropped; any other text
    /// is kept as typed.
    pub fn emit_user_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.profile.strips_markup && clean(text).is_empty() {
            tracing::trace!("Suppressing markup-only user message");
            return;
        }
        if self
            .profile
            .suppressed_prefixes
            .iter()
            .any(|prefix| text.starts_with(prefix))
        {
            tracing::trace!("Suppressing boilerplate user message");
            return;
        }
        self.emit(DiagEvent::user(text));
    }

    /// Format a call with the schema's argument table, remembering it when
    /// it carries a correlation id.
    pub fn tool_call(&mut self, id: Option<String>, name: &str, args: &ToolArgs) -> ToolCallRef {
        let summary = format_call(name, args, self.profile.call_format);
        if let Some(id) = &id {
            self.pending.insert(id.clone(), name.to_string());
        }
        ToolCallRef {
            id,
            name: name.to_string(),
            summary,
        }
    }

    /// Tool name for a result: the pending call, else `fallback`, else the
    /// placeholder.
    pub fn resolve_result(&mut self, id: Option<&str>, fallback: Option<&str>) -> String {
        if let Some(id) = id {
            if let Some(name) = self.pending.take(id) {
                return name;
            }
            tracing::debug!("No pending call for result {}", id);
        }
        fallback
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(PLACEHOLDER_TOOL)
            .to_string()
    }
}

/// Run `record` through `rules`; `false` when no rule claimed it.
pub(crate) fn dispatch(rules: &[Rule], scope: &mut Scope<'_>, record: &Value) -> bool {
    match rules.iter().find(|rule| (rule.matches)(record)) {
        Some(rule) => {
            tracing::trace!("Record matched rule {}", rule.label);
            (rule.extract)(scope, record);
            true
        }
        None => false,
    }
}

/// Single-pass event extraction for one transcript.
pub struct Correlator<'s> {
    schema: &'s dyn TranscriptSchema,
    pending: PendingCalls,
}

impl<'s> Correlator<'s> {
    pub fn new(schema: &'s dyn TranscriptSchema) -> Self {
        Self {
            schema,
            pending: PendingCalls::new(),
        }
    }

    /// Events produced by one record, in emission order.
    pub fn feed(&mut self, record: &Value) -> Vec<DiagEvent> {
        let mut events = Vec::new();
        if !record.is_object() {
            tracing::debug!("Skipping non-object {} record", self.schema.name());
            return events;
        }
        let mut scope = Scope {
            pending: &mut self.pending,
            events: &mut events,
            profile: self.schema.profile(),
        };
        if !dispatch(self.schema.rules(), &mut scope, record) {
            tracing::trace!("Dropping unclassified {} record", self.schema.name());
        }
        events
    }

    pub fn pending(&self) -> &PendingCalls {
        &self.pending
    }
}

/// Lazily correlated events over a record stream.
pub struct CorrelatedEvents<'s, I> {
    correlator: Correlator<'s>,
    records: I,
    ready: VecDeque<DiagEvent>,
}

impl<I: Iterator<Item = Value>> Iterator for CorrelatedEvents<'_, I> {
    type Item = DiagEvent;

    fn next(&mut self) -> Option<DiagEvent> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }
            let record = self.records.next()?;
            self.ready.extend(self.correlator.feed(&record));
        }
    }
}

pub fn correlate<I>(schema: &dyn TranscriptSchema, records: I) -> CorrelatedEvents<'_, I::IntoIter>
where
    I: IntoIterator<Item = Value>,
{
    CorrelatedEvents {
        correlator: Correlator::new(schema),
        records: records.into_iter(),
        ready: VecDeque::new(),
    }
}

/// Rendered diagnostic entries for a whole record stream.
pub fn process<I>(schema: &dyn TranscriptSchema, records: I, limits: TruncationLimits) -> Vec<String>
where
    I: IntoIterator<Item = Value>,
{
    correlate(schema, records)
        .map(|event| event.render(limits))
        .collect()
}
