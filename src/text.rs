//! Text helpers shared by the crawler, summarizer, and prompt builders
//!
//! All budgets in this crate are counted in characters, not bytes, so the
//! truncation helper has to respect UTF-8 boundaries.

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Collapse all runs of whitespace (including newlines) into single
/// spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
