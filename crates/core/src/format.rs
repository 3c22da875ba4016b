//! One-line renderings of tool calls and tool results.
//!
//! Which argument fields are "interesting" differs per transcript schema, so
//! the call formatter is driven by a [`CallFormat`] table rather than a fixed
//! list of keys.

use crate::config::TruncationLimits;
use crate::truncate::{cap_inclusive, cap_then_mark, truncate_with};
use serde_json::{Map, Value};

const COMMAND_MAX_CHARS: usize = 80;
const EDIT_SIDE_MAX_CHARS: usize = 40;
const FALLBACK_MAX_CHARS: usize = 60;
const WRITE_CONTENT_MAX_CHARS: usize = 60;

/// Body sentinel some tools emit for an empty result.
pub const NO_CONTENT: &str = "(no content)";

/// Per-schema table of argument synonyms the call formatter recognizes.
#[derive(Debug, Clone, Copy)]
pub struct CallFormat {
    /// Primary subject keys, first present wins.
    pub path_keys: &'static [&'static str],
    /// Shell command keys, first present wins.
    pub command_keys: &'static [&'static str],
    /// Before/after pairs; only the first pair with both sides present renders.
    pub edit_pairs: &'static [(&'static str, &'static str)],
    /// Extra single values, each rendered when present.
    pub labelled: &'static [Labelled],
    /// Tool names (lowercase) whose `content` argument is shown.
    pub write_tools: &'static [&'static str],
}

/// A single argument rendered as `label="value"` (or `"value"` with no label).
#[derive(Debug, Clone, Copy)]
pub struct Labelled {
    pub key: &'static str,
    pub label: Option<&'static str>,
}

impl Labelled {
    pub const fn named(key: &'static str) -> Self {
        Self {
            key,
            label: Some(key),
        }
    }

    pub const fn bare(key: &'static str) -> Self {
        Self { key, label: None }
    }
}

/// Arguments as they arrived on a call record.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    Map(Map<String, Value>),
    /// Arguments that are not (and do not decode to) a mapping.
    Opaque(String),
}

impl ToolArgs {
    /// Normalize a raw arguments value.
    ///
    /// Strings get one secondary JSON decode; when that does not produce an
    /// object, the string is kept as opaque text.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => ToolArgs::Map(Map::new()),
            Some(Value::Object(map)) => ToolArgs::Map(map.clone()),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => ToolArgs::Map(map),
                _ => ToolArgs::Opaque(raw.clone()),
            },
            Some(other) => ToolArgs::Opaque(other.to_string()),
        }
    }

    /// Like [`ToolArgs::from_value`] but non-mapping input becomes an empty map.
    pub fn map_or_empty(value: Option<&Value>) -> Self {
        match Self::from_value(value) {
            ToolArgs::Opaque(_) => ToolArgs::Map(Map::new()),
            map => map,
        }
    }
}

/// Recognized argument shapes, in rendering order.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgShape {
    Path(String),
    Command(String),
    EditPair { before: String, after: String },
    Labelled { label: Option<&'static str>, value: String },
    WriteContent(String),
}

impl ArgShape {
    fn render(&self) -> String {
        match self {
            ArgShape::Path(path) => path.clone(),
            ArgShape::Command(cmd) => format!("`{}`", cap_inclusive(cmd, COMMAND_MAX_CHARS)),
            ArgShape::EditPair { before, after } => format!(
                "\"{}\" → \"{}\"",
                escape_newlines(&cap_then_mark(before, EDIT_SIDE_MAX_CHARS)),
                escape_newlines(&cap_then_mark(after, EDIT_SIDE_MAX_CHARS)),
            ),
            ArgShape::Labelled { label, value } => match label {
                Some(label) => format!("{label}=\"{value}\""),
                None => format!("\"{value}\""),
            },
            ArgShape::WriteContent(content) => format!(
                "content=\"{}\"",
                escape_newlines(&cap_inclusive(content, WRITE_CONTENT_MAX_CHARS))
            ),
        }
    }
}

/// Pick out the shapes `format` knows about, in priority order.
pub fn recognize(name: &str, args: &Map<String, Value>, format: &CallFormat) -> Vec<ArgShape> {
    let mut shapes = Vec::new();

    if let Some(path) = first_text(args, format.path_keys) {
        shapes.push(ArgShape::Path(path));
    }
    if let Some(cmd) = first_text(args, format.command_keys) {
        shapes.push(ArgShape::Command(cmd));
    }
    for (before_key, after_key) in format.edit_pairs {
        if let (Some(before), Some(after)) = (text_of(args, before_key), text_of(args, after_key)) {
            shapes.push(ArgShape::EditPair { before, after });
            break;
        }
    }
    for labelled in format.labelled {
        if let Some(value) = text_of(args, labelled.key) {
            shapes.push(ArgShape::Labelled {
                label: labelled.label,
                value,
            });
        }
    }
    let lower = name.to_ascii_lowercase();
    if format.write_tools.contains(&lower.as_str()) {
        if let Some(content) = text_of(args, "content") {
            shapes.push(ArgShape::WriteContent(content));
        }
    }

    shapes
}

/// Render a tool call as `[name] <args>` on a single line.
pub fn format_call(name: &str, args: &ToolArgs, format: &CallFormat) -> String {
    let rendered = match args {
        ToolArgs::Opaque(raw) => cap_inclusive(raw, FALLBACK_MAX_CHARS),
        ToolArgs::Map(map) => {
            let shapes = recognize(name, map, format);
            if shapes.is_empty() {
                let compact = serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string());
                cap_inclusive(&compact, FALLBACK_MAX_CHARS)
            } else {
                shapes
                    .iter()
                    .map(ArgShape::render)
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    };
    escape_newlines(&format!("[{name}] {rendered}"))
}

/// Render a tool result: `TOOL [name]: ✓|✗ body`, continuation lines indented.
pub fn format_result(name: &str, is_error: bool, body: &str, limits: TruncationLimits) -> String {
    let status = if is_error { "✗" } else { "✓" };

    if body.is_empty() || body == NO_CONTENT {
        return format!("TOOL [{name}]: {status}");
    }

    let truncated = truncate_with(body, limits);
    let mut lines = truncated.split('\n');
    let first = lines.next().unwrap_or_default();
    let rest: Vec<String> = lines.map(|line| format!("  {line}")).collect();
    if rest.is_empty() {
        format!("TOOL [{name}]: {status} {first}")
    } else {
        format!("TOOL [{name}]: {status} {first}\n{}", rest.join("\n"))
    }
}

fn escape_newlines(text: &str) -> String {
    text.replace('\n', "\\n")
}

fn first_text(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text_of(args, key))
}

/// Present, non-null argument as display text. Strings stay raw, other
/// values use their JSON form.
fn text_of(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
