//! Synthetic slash-command markup used by Claude Code transcripts.
//!
//! A slash command shows up in the user turn as
//! `<command-name>/foo</command-name><command-message>…</command-message><command-args>…</command-args>`
//! and its captured output as `<local-command-stdout>…</local-command-stdout>`.

use regex::Regex;
use std::sync::LazyLock;

static LOCAL_STDOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<local-command-stdout>([^<]*)</local-command-stdout>").unwrap()
});

static COMMAND_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<command-name>([^<]+)</command-name>").unwrap());

static COMMAND_MESSAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<command-message>[^<]*</command-message>").unwrap());

static COMMAND_ARGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<command-args>[^<]*</command-args>").unwrap());

static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

pub const COMMAND_NAME_OPEN: &str = "<command-name>";
pub const LOCAL_STDOUT_OPEN: &str = "<local-command-stdout>";

/// Rewrite synthetic markup into plain text.
///
/// A `<local-command-stdout>` wrapper wins over everything else: only its
/// trimmed content is returned. Otherwise command names become `[name]`,
/// message/args wrappers are dropped, and any other tag is removed while its
/// content is kept. Text without tags is returned unchanged.
pub fn clean(text: &str) -> String {
    if let Some(caps) = LOCAL_STDOUT_RE.captures(text) {
        return caps[1].trim().to_string();
    }
    if !ANY_TAG_RE.is_match(text) {
        return text.to_string();
    }

    let out = COMMAND_NAME_RE.replace_all(text, "[$1]");
    let out = COMMAND_MESSAGE_RE.replace_all(&out, "");
    let out = COMMAND_ARGS_RE.replace_all(&out, "");
    let out = ANY_TAG_RE.replace_all(&out, "");
    out.trim().to_string()
}

/// First slash-command name in `text`, if any.
pub fn command_name(text: &str) -> Option<String> {
    COMMAND_NAME_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

pub fn has_command_name(text: &str) -> bool {
    text.contains(COMMAND_NAME_OPEN)
}

pub fn has_local_stdout(text: &str) -> bool {
    text.contains(LOCAL_STDOUT_OPEN)
}
