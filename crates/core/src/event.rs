use crate::config::TruncationLimits;
use crate::format::format_result;
use crate::truncate::truncate;
use serde::{Deserialize, Serialize};

/// Limits used for `[COMPACT SUMMARY]` blocks.
pub const COMPACT_SUMMARY_LIMITS: TruncationLimits = TruncationLimits::new(12, 800);
/// Limits used for reasoning excerpts.
pub const REASONING_LIMITS: TruncationLimits = TruncationLimits::new(4, 200);

/// Name shown for a result whose call was never seen.
pub const PLACEHOLDER_TOOL: &str = "tool";
/// Name shown for captured slash-command output.
pub const COMMAND_TOOL: &str = "cmd";

/// A tool invocation rendered inside an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Pre-rendered `[name] <args>` line.
    pub summary: String,
}

/// How continuation lines of assistant text are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLayout {
    /// Indent continuation lines and drop blank ones.
    #[default]
    Compact,
    /// Indent every continuation line, blank ones included.
    Indented,
    /// Print the text unchanged after `A: `.
    Verbatim,
}

impl TextLayout {
    fn is_compact(&self) -> bool {
        *self == TextLayout::Compact
    }
}

/// Schema-independent unit produced by the correlator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagEvent {
    UserMessage {
        text: String,
    },
    AssistantMessage {
        text: String,
        tool_calls: Vec<ToolCallRef>,
        #[serde(default, skip_serializing_if = "TextLayout::is_compact")]
        layout: TextLayout,
    },
    ToolResult {
        name: String,
        is_error: bool,
        body: String,
    },
    CompactSummary {
        text: String,
    },
    ReasoningNote {
        text: String,
    },
}

impl DiagEvent {
    pub fn user(text: impl Into<String>) -> Self {
        DiagEvent::UserMessage { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCallRef>) -> Self {
        DiagEvent::AssistantMessage {
            text: text.into(),
            tool_calls,
            layout: TextLayout::Compact,
        }
    }

    /// Replace the text layout of an assistant message; other events are
    /// returned unchanged.
    pub fn with_layout(mut self, new_layout: TextLayout) -> Self {
        if let DiagEvent::AssistantMessage { layout, .. } = &mut self {
            *layout = new_layout;
        }
        self
    }

    pub fn tool_result(name: impl Into<String>, is_error: bool, body: impl Into<String>) -> Self {
        DiagEvent::ToolResult {
            name: name.into(),
            is_error,
            body: body.into(),
        }
    }

    /// Events carrying nothing to show are suppressed by the correlator.
    ///
    /// Tool results always render (at least their status), so they are never
    /// empty.
    pub fn is_empty(&self) -> bool {
        match self {
            DiagEvent::UserMessage { text }
            | DiagEvent::CompactSummary { text }
            | DiagEvent::ReasoningNote { text } => text.trim().is_empty(),
            DiagEvent::AssistantMessage {
                text, tool_calls, ..
            } => text.trim().is_empty() && tool_calls.is_empty(),
            DiagEvent::ToolResult { .. } => false,
        }
    }

    /// Render as one diagnostic entry (possibly several lines).
    pub fn render(&self, limits: TruncationLimits) -> String {
        match self {
            DiagEvent::UserMessage { text } => format!("USER: {text}"),
            DiagEvent::AssistantMessage {
                text,
                tool_calls,
                layout,
            } => render_assistant(text, tool_calls, *layout),
            DiagEvent::ToolResult {
                name,
                is_error,
                body,
            } => format_result(name, *is_error, body, limits),
            DiagEvent::CompactSummary { text } => format!(
                "[COMPACT SUMMARY]\n{}",
                truncate(
                    text,
                    COMPACT_SUMMARY_LIMITS.max_output_lines,
                    COMPACT_SUMMARY_LIMITS.max_output_chars
                )
            ),
            DiagEvent::ReasoningNote { text } => format!(
                "A: [reasoning] {}",
                truncate(
                    text,
                    REASONING_LIMITS.max_output_lines,
                    REASONING_LIMITS.max_output_chars
                )
            ),
        }
    }
}

fn render_assistant(text: &str, tool_calls: &[ToolCallRef], layout: TextLayout) -> String {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        lines.push("A:".to_string());
    } else if layout == TextLayout::Verbatim {
        lines.push(format!("A: {text}"));
    } else {
        let mut text_lines = text.split('\n');
        let first = text_lines.next().unwrap_or_default();
        lines.push(format!("A: {first}"));
        lines.extend(
            text_lines
                .filter(|line| layout == TextLayout::Indented || !line.trim().is_empty())
                .map(|line| format!("   {line}")),
        );
    }
    lines.extend(tool_calls.iter().map(|call| format!("  {}", call.summary)));
    lines.join("\n")
}
