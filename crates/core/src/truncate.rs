//! Line/character truncation for tool output and summaries.
//!
//! Both limits are applied in order: lines first, then characters over the
//! already line-cut text. Markers state how much was dropped so a reader
//! knows the output is partial.

use crate::config::TruncationLimits;

/// Default number of lines kept from a tool result body.
pub const MAX_OUTPUT_LINES: usize = 8;
/// Default number of characters kept from a tool result body.
pub const MAX_OUTPUT_CHARS: usize = 500;

/// Truncate `text` to at most `max_lines` lines and `max_chars` characters.
///
/// Lines are split on `\n` only, so a trailing newline counts as an extra
/// (empty) line. Character counts are Unicode scalar values.
pub fn truncate(text: &str, max_lines: usize, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = text.to_string();

    let line_count = text.split('\n').count();
    if line_count > max_lines {
        let kept: Vec<&str> = text.split('\n').take(max_lines).collect();
        out = format!(
            "{}\n  ... ({} more lines)",
            kept.join("\n"),
            line_count - max_lines
        );
    }

    let char_count = out.chars().count();
    if char_count > max_chars {
        let head: String = out.chars().take(max_chars).collect();
        out = format!("{}... ({} more chars)", head, char_count - max_chars);
    }

    out
}

/// [`truncate`] with a limits pair.
pub fn truncate_with(text: &str, limits: TruncationLimits) -> String {
    truncate(text, limits.max_output_lines, limits.max_output_chars)
}

/// Cap `text` at `max_chars` characters, keeping `max_chars - 3` and adding `...`.
///
/// Used for single-line argument renderings where the marker has to fit
/// inside the budget.
pub fn cap_inclusive(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Keep the first `max_chars` characters and append `...` when anything was cut.
pub fn cap_then_mark(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}
