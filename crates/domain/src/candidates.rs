//! Candidate extraction from free-form assistant text.
//!
//! The guide offers themes and room elements as numbered lists, but the
//! model is not consistent about formatting. Patterns are tried from most to
//! least specific and the first pattern that yields anything wins:
//!
//! 1. `1. **Space Station**` - numbered items with bold names
//! 2. `1. Space Station` - numbered items at line start, name runs to end of line
//! 3. `... 1. Space Station. 2. Castle.` - inline items terminated by a period

use regex_lite::Regex;
use std::sync::LazyLock;

static NUMBERED_BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s*\*\*(.+?)\*\*").expect("valid regex"));
static NUMBERED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+(.+?)[ \t]*$").expect("valid regex"));
static NUMBERED_PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.[ \t]+([^.\n]+)\.").expect("valid regex"));

// A stray capital letter left over from list markers like "A Castle" / "B Jungle".
static LEADING_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][ \t]+").expect("valid regex"));

/// Extract candidate names offered in `text`, in order of appearance.
///
/// An empty result means nothing was offered this turn; it is not an error.
pub fn extract_candidates(text: &str) -> Vec<String> {
    for pattern in [&*NUMBERED_BOLD_RE, &*NUMBERED_LINE_RE, &*NUMBERED_PERIOD_RE] {
        let found: Vec<String> = pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_candidate(m.as_str()))
            .filter(|name| !name.is_empty())
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Whether `text` looks like a list of themes rather than room elements.
///
/// Requires emphasis markers plus either a numbered bold list or the word
/// "theme".
pub fn looks_like_theme_list(text: &str) -> bool {
    text.contains("**")
        && (NUMBERED_BOLD_RE.is_match(text) || text.to_lowercase().contains("theme"))
}

fn clean_candidate(raw: &str) -> String {
    let without_emphasis = raw.replace("**", "").replace(['*', '_'], "");
    let trimmed = without_emphasis.trim();
    LEADING_LETTER_RE.replace(trimmed, "").trim().to_string()
}
