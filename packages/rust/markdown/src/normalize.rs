//! Whitespace normalization passes for extracted document text.
//!
//! Each pass is a function `&str -> String` applied in sequence. The whole
//! pipeline is deterministic and idempotent: normalizing already-normalized
//! text is a no-op.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full normalization pipeline.
pub fn normalize(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_trailing_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: strip trailing whitespace per line
// ---------------------------------------------------------------------------

/// Remove trailing whitespace on every line. Runs before blank-line
/// collapsing so that space-only lines count as blank.
fn strip_trailing_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: collapse excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ consecutive blank lines down to exactly 2.
/// Runs of 1-2 blank lines are left untouched.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: ensure trailing newline
// ---------------------------------------------------------------------------

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(text: &str) -> String {
    let trimmed = text.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
