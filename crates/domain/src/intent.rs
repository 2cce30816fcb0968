//! Named transition guards over raw user input.
//!
//! Each guard is a pure predicate so the resolver's heuristics can be listed,
//! tested and swapped one at a time.

const HINT_PHRASES: &[&str] = &[
    "hint",
    "a hint",
    "hint please",
    "give me a hint",
    "i need a hint",
    "can i have a hint",
    "can i get a hint",
    "another hint",
    "help",
];

const THEME_CHANGE_PHRASES: &[&str] = &[
    "change theme",
    "change the theme",
    "new theme",
    "different theme",
    "another theme",
    "switch theme",
    "show themes",
    "show me themes",
    "more themes",
    "other themes",
    "pick another theme",
];

const AFFIRMATIVES: &[&str] = &["yes", "yeah", "yep", "sure"];

/// Oldest age accepted as a plausible answer to "how old are you?".
const MAX_PLAYER_AGE: u32 = 120;

/// Classification of one user message, in guard priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Player wants to pick a different theme.
    ChangeTheme,
    /// Player asked for a hint.
    Hint,
    /// Player typed `next` to start the game.
    Next,
    /// Player agreed to the guide's suggestion.
    Affirmative,
    /// A bare positive integer (list index or age).
    Number(u32),
    /// Anything else.
    FreeText,
}

fn normalized(input: &str) -> String {
    input
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_lowercase()
}

pub fn is_hint_request(input: &str) -> bool {
    let text = normalized(input);
    HINT_PHRASES.contains(&text.as_str())
}

/// Exact phrase, or any message mentioning both "theme" and "other".
pub fn is_theme_change(input: &str) -> bool {
    let text = normalized(input);
    THEME_CHANGE_PHRASES.contains(&text.as_str())
        || (text.contains("theme") && text.contains("other"))
}

pub fn is_affirmative(input: &str) -> bool {
    let text = normalized(input);
    AFFIRMATIVES.contains(&text.as_str())
}

pub fn is_next(input: &str) -> bool {
    normalized(input) == "next"
}

/// Parse a bare positive integer.
pub fn parse_number(input: &str) -> Option<u32> {
    let text = input.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|n| *n > 0)
}

/// Parse an age answer such as `9` or `I'm 12`.
pub fn parse_age(input: &str) -> Option<u32> {
    let digits: String = input
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .ok()
        .filter(|age| (1..=MAX_PLAYER_AGE).contains(age))
}

/// Classify `input` using the guards above, first match wins.
pub fn classify(input: &str) -> Intent {
    if is_theme_change(input) {
        Intent::ChangeTheme
    } else if is_hint_request(input) {
        Intent::Hint
    } else if is_next(input) {
        Intent::Next
    } else if is_affirmative(input) {
        Intent::Affirmative
    } else if let Some(n) = parse_number(input) {
        Intent::Number(n)
    } else {
        Intent::FreeText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_variants() {
        assert!(is_hint_request("hint"));
        assert!(is_hint_request("  Give me a hint! "));
        assert!(is_hint_request("I need a hint."));
        assert!(!is_hint_request("the hint was useless, the answer is 42"));
    }

    #[test]
    fn test_theme_change_phrases_and_conjunction() {
        assert!(is_theme_change("change theme"));
        assert!(is_theme_change("New Theme!"));
        assert!(is_theme_change("can I see some other theme ideas"));
        assert!(!is_theme_change("I like this theme"));
        assert!(!is_theme_change("the other door"));
    }

    #[test]
    fn test_affirmatives() {
        for word in ["yes", "Yeah", "yep!", "sure."] {
            assert!(is_affirmative(word), "{word} should be affirmative");
        }
        assert!(!is_affirmative("yes, the clock"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("2"), Some(2));
        assert_eq!(parse_number(" 12 "), Some(12));
        assert_eq!(parse_number("0"), None);
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("2nd"), None);
    }

    #[test]
    fn test_age_parsing() {
        assert_eq!(parse_age("9"), Some(9));
        assert_eq!(parse_age("I'm 12 years old"), Some(12));
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_age("500"), None);
        assert_eq!(parse_age("twelve"), None);
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(classify("other theme please"), Intent::ChangeTheme);
        assert_eq!(classify("hint"), Intent::Hint);
        assert_eq!(classify("Next"), Intent::Next);
        assert_eq!(classify("yep"), Intent::Affirmative);
        assert_eq!(classify("3"), Intent::Number(3));
        assert_eq!(classify("the castle"), Intent::FreeText);
    }
}
