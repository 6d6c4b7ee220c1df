//! Rendering of replayed messages and reports.

use chrono::{DateTime, Utc};

use crate::domain::SourceMessage;

pub const NO_TEXT_PLACEHOLDER: &str = "*(no text content)*";

/// Fixed-format UTC timestamp used in replay headers.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Header + body for one replayed message. Attachment/embed markers are
/// appended by the caller.
pub fn render_record(msg: &SourceMessage) -> String {
    let body = match msg.content.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => NO_TEXT_PLACEHOLDER,
    };
    format!(
        "**{}** ({}) · {}\n{}",
        msg.author.display_name,
        msg.author.mention,
        format_timestamp(msg.created_at),
        body
    )
}

pub fn attachment_failure_line(filename: &str, reason: &str) -> String {
    format!("⚠️ failed to copy attachment `{filename}` ({reason})")
}

pub fn embed_marker(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("_(1 embed not copied)_".to_string()),
        n => Some(format!("_({n} embeds not copied)_")),
    }
}

/// Split `s` into chunks of at most `max_len` characters, preferring to break
/// after a newline in the back half of a chunk.
pub fn split_message(s: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut out = Vec::new();
    let mut rest = s;

    while rest.chars().count() > max_len {
        let hard = byte_index_at_char(rest, max_len);
        let cut = match rest[..hard].rfind('\n') {
            Some(nl) if nl >= hard / 2 => nl + 1,
            _ => hard,
        };
        out.push(rest[..cut].trim_end_matches('\n').to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() || out.is_empty() {
        out.push(rest.to_string());
    }
    out
}

fn byte_index_at_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
