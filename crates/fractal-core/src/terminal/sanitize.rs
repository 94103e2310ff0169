//! Terminal output sanitizer
//!
//! Captured shell output is full of shell-integration markers, colour codes
//! and cursor movement. These helpers reduce it to plain text and bound it.

use once_cell::sync::Lazy;
use regex::Regex;

// OSC sequences, BEL- or ST-terminated (shell integration markers like ]633;C)
static OSC_BEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\][^\x07]*\x07").expect("valid regex"));
static OSC_ST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\][^\x1b]*\x1b\\").expect("valid regex"));
// CSI sequences: colours, cursor movement, formatting
static CSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("valid regex"));
// Remaining control characters except \t, \n and \r
static CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B-\x0C\x0E-\x1F\x7F]").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Ellipsis prefixed to a running command's tail
pub const TAIL_ELLIPSIS: &str = "…";

/// Strip escape sequences and control characters, normalize whitespace.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let cleaned = OSC_BEL.replace_all(raw, "");
    let cleaned = OSC_ST.replace_all(&cleaned, "");
    let cleaned = CSI.replace_all(&cleaned, "");
    let cleaned = CONTROL.replace_all(&cleaned, "");

    let joined = cleaned
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Keep the head of `text`, at most `max_chars` characters plus an ellipsis.
///
/// Cuts at the last newline inside the window when that newline lies in the
/// final 30% of it (`text\n...`), otherwise hard-cuts (`text...`).
pub fn truncate_output(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];

    if let Some(newline) = head.rfind('\n') {
        let newline_chars = head[..newline].chars().count();
        if newline_chars as f64 > max_chars as f64 * 0.7 {
            return format!("{}\n...", &head[..newline]);
        }
    }
    format!("{}...", head)
}

/// Sanitized preview of captured output.
///
/// Running commands keep the tail (most recent output) prefixed with `…`;
/// completed commands keep the head via [`truncate_output`].
pub fn output_preview(raw: &str, is_running: bool, max_chars: usize) -> String {
    let cleaned = sanitize(raw);
    if cleaned.is_empty() {
        return cleaned;
    }

    if !is_running {
        return truncate_output(&cleaned, max_chars);
    }

    let total = cleaned.chars().count();
    if total <= max_chars {
        return cleaned;
    }
    let start = cleaned
        .char_indices()
        .nth(total - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}{}", TAIL_ELLIPSIS, &cleaned[start..])
}
