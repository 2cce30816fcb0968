//! Post-validation of the guide's replies.
//!
//! Replies are checked by an ordered list of named rules. Each rule has a
//! trigger and a replacement and may update the session; the outcome records
//! which rules fired so callers can log them.

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::candidates::extract_candidates;
use crate::session::SessionState;

/// Points for solving an element without a hint.
pub const POINTS_NO_HINT: u32 = 10;
/// Points for solving an element after asking for a hint.
pub const POINTS_WITH_HINT: u32 = 5;

/// Elements used when the model re-offers themes after a theme was chosen.
pub const FALLBACK_ELEMENTS: [&str; 3] = ["Locked Cabinet", "Dusty Journal", "Flickering Lamp"];

/// Replies offering more items than this right after a theme pick are
/// treated as a re-offered theme list.
const MAX_ELEMENTS_AFTER_THEME: usize = 3;

/// Sent instead of a reply that stayed in a non-English script after all retries.
pub const LANGUAGE_REDIRECT_MESSAGE: &str = "Let's keep our adventure in English! \
Tell me which theme or element you'd like to explore, or type 'hint' if you're stuck.";

static CORRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcorrect").expect("valid regex"));
static SCORE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*[*_#>-]*[ \t]*(?:your[ \t]+)?(?:total[ \t]+)?(?:score|lives|points|hearts)[*_]*[ \t]*[:=][^\n]*\n?",
    )
    .expect("valid regex")
});
static INLINE_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:score|lives|hearts)[*_]*[ \t]*[:=][ \t]*[*_]*\d+(?:[ \t]*/[ \t]*\d+)?[*_]*")
        .expect("valid regex")
});
static INLINE_POINTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?[+-]\d+[ \t]*(?:points?|pts)\)?!?").expect("valid regex")
});
static EXTRA_SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));
static TRAILING_SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));
static EXTRA_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Whether `text` contains CJK ideographs, kana or CJK punctuation.
pub fn contains_disallowed_script(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
            | '\u{3040}'..='\u{30FF}' // Hiragana, Katakana
            | '\u{31F0}'..='\u{31FF}' // Katakana phonetic extensions
            | '\u{3400}'..='\u{4DBF}' // CJK extension A
            | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
            | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
            | '\u{FF66}'..='\u{FF9F}' // Half-width katakana
        )
    })
}

/// Whether the reply tells the player they got it right.
///
/// "incorrect", "not correct" and "isn't correct" do not count.
pub fn announces_correct_answer(text: &str) -> bool {
    CORRECT_RE.find_iter(text).any(|m| {
        let before = text[..m.start()].trim_end().to_lowercase();
        !(before.ends_with("not") || before.ends_with("n't") || before.ends_with("n\u{2019}t"))
    })
}

/// Remove score, lives and points markup the model was told not to produce.
pub fn strip_score_markup(text: &str) -> String {
    let without_lines = SCORE_LINE_RE.replace_all(text, "");
    let without_scores = INLINE_SCORE_RE.replace_all(&without_lines, "");
    let without_inline = INLINE_POINTS_RE.replace_all(&without_scores, "");
    let spaced = EXTRA_SPACES_RE.replace_all(&without_inline, " ");
    let trimmed_lines = TRAILING_SPACES_RE.replace_all(&spaced, "");
    EXTRA_NEWLINES_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

/// Room description used when the model offers themes instead of elements.
pub fn fallback_room_description(theme: &str) -> String {
    let [first, second, third] = FALLBACK_ELEMENTS;
    format!(
        "Welcome to the {theme}! The door clicks shut behind you and the room falls silent. \
Three things catch your eye:\n1. **{first}**\n2. **{second}**\n3. **{third}**\n\
Which one would you like to explore?"
    )
}

/// A single named post-validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyRule {
    /// A theme was just chosen but the reply lists more than three items.
    ReplaceThemeReoffer,
    /// The reply confirms the answer for the selected, unsolved element.
    MarkSolved,
    /// The reply contains score/lives markup.
    StripScoreMarkup,
}

impl ReplyRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceThemeReoffer => "replace_theme_reoffer",
            Self::MarkSolved => "mark_solved",
            Self::StripScoreMarkup => "strip_score_markup",
        }
    }
}

/// Facts about the current turn the rules need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyContext {
    pub just_selected_theme: bool,
}

/// Result of running the policy over one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    /// Text to show and store.
    pub text: String,
    /// Rules that fired, in order.
    pub applied: Vec<ReplyRule>,
    /// Element solved this turn, if any.
    pub solved: Option<String>,
    pub points_awarded: u32,
}

/// Ordered list of rules applied to every reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPolicy {
    rules: Vec<ReplyRule>,
}

impl Default for ReplyPolicy {
    fn default() -> Self {
        Self::new(vec![
            ReplyRule::ReplaceThemeReoffer,
            ReplyRule::MarkSolved,
            ReplyRule::StripScoreMarkup,
        ])
    }
}

impl ReplyPolicy {
    pub fn new(rules: Vec<ReplyRule>) -> Self {
        Self { rules }
    }

    /// Run every rule over `reply`, updating `state` as rules fire.
    pub fn apply(&self, reply: &str, state: &mut SessionState, ctx: ReplyContext) -> ReplyOutcome {
        let mut outcome = ReplyOutcome {
            text: reply.trim().to_string(),
            applied: Vec::new(),
            solved: None,
            points_awarded: 0,
        };

        for rule in &self.rules {
            let fired = match rule {
                ReplyRule::ReplaceThemeReoffer => replace_theme_reoffer(&mut outcome, state, ctx),
                ReplyRule::MarkSolved => mark_solved(&mut outcome, state),
                ReplyRule::StripScoreMarkup => {
                    let stripped = strip_score_markup(&outcome.text);
                    let changed = stripped != outcome.text;
                    outcome.text = stripped;
                    changed
                }
            };
            if fired {
                outcome.applied.push(*rule);
            }
        }

        outcome
    }
}

fn replace_theme_reoffer(
    outcome: &mut ReplyOutcome,
    state: &mut SessionState,
    ctx: ReplyContext,
) -> bool {
    if !ctx.just_selected_theme {
        return false;
    }
    let Some(theme) = state.current_theme().map(str::to_string) else {
        return false;
    };
    if extract_candidates(&outcome.text).len() <= MAX_ELEMENTS_AFTER_THEME {
        return false;
    }

    outcome.text = fallback_room_description(&theme);
    state.replace_last_elements(FALLBACK_ELEMENTS.iter().map(|e| e.to_string()).collect());
    true
}

fn mark_solved(outcome: &mut ReplyOutcome, state: &mut SessionState) -> bool {
    let Some(element) = state.current_element().map(str::to_string) else {
        return false;
    };
    if state.is_solved(&element) || !announces_correct_answer(&outcome.text) {
        return false;
    }

    let points = if state.used_hint() {
        POINTS_WITH_HINT
    } else {
        POINTS_NO_HINT
    };
    state.mark_solved(&element);
    state.add_score(points);
    state.clear_element();
    state.set_used_hint(false);

    outcome.solved = Some(element);
    outcome.points_awarded = points;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle_state(element: &str) -> SessionState {
        let mut state = SessionState::new();
        state.select_theme("Space Station");
        state.replace_last_elements(vec![element.to_string()]);
        state.select_element(element).expect("theme is set");
        state
    }

    #[test]
    fn test_detects_cjk_and_kana() {
        assert!(contains_disallowed_script("你好，探险家"));
        assert!(contains_disallowed_script("Welcome カタカナ"));
        assert!(contains_disallowed_script("ひらがな"));
        assert!(!contains_disallowed_script("Welcome, explorer! Café déjà vu 🎉"));
    }

    #[test]
    fn test_correct_detection_ignores_negations() {
        assert!(announces_correct_answer("Correct! Well done."));
        assert!(announces_correct_answer("That's CORRECT, the code is 42"));
        assert!(!announces_correct_answer("That's incorrect, try again."));
        assert!(!announces_correct_answer("Hmm, that's not correct."));
        assert!(!announces_correct_answer("That isn't correct yet."));
        assert!(announces_correct_answer("Not bad - that is correct!"));
    }

    #[test]
    fn test_strip_score_markup() {
        let reply = "Correct! (+10 points)\n**Score:** 10\nLives: 3\n\n\n\nPick another element.";
        assert_eq!(strip_score_markup(reply), "Correct!\n\nPick another element.");
        assert_eq!(strip_score_markup("Nice work! +5 points! On to the next."), "Nice work! On to the next.");
        assert_eq!(strip_score_markup("Correct! Score: 20 Lives: 2/3"), "Correct!");
    }

    #[test]
    fn test_strip_leaves_clean_text_alone() {
        let reply = "The panel hums. What do you do?";
        assert_eq!(strip_score_markup(reply), reply);
    }

    #[test]
    fn test_mark_solved_awards_points_and_returns_to_element_selection() {
        let mut state = puzzle_state("Cryo Chamber");
        let outcome = ReplyPolicy::default().apply("Correct! The chamber opens.", &mut state, ReplyContext::default());

        assert_eq!(outcome.solved.as_deref(), Some("Cryo Chamber"));
        assert_eq!(outcome.points_awarded, POINTS_NO_HINT);
        assert!(outcome.applied.contains(&ReplyRule::MarkSolved));
        assert!(state.is_solved("cryo chamber"));
        assert_eq!(state.current_element(), None);
        assert_eq!(state.current_theme(), Some("Space Station"));
        assert_eq!(state.score(), 10);
    }

    #[test]
    fn test_hint_halves_points_and_is_cleared() {
        let mut state = puzzle_state("Cryo Chamber");
        state.set_used_hint(true);
        let outcome = ReplyPolicy::default().apply("correct!", &mut state, ReplyContext::default());

        assert_eq!(outcome.points_awarded, POINTS_WITH_HINT);
        assert!(!state.used_hint());
    }

    #[test]
    fn test_solving_twice_never_double_counts() {
        let mut state = puzzle_state("Cryo Chamber");
        let policy = ReplyPolicy::default();
        policy.apply("Correct!", &mut state, ReplyContext::default());

        state.select_element("Cryo Chamber").expect("theme is set");
        let outcome = policy.apply("Correct again!", &mut state, ReplyContext::default());

        assert_eq!(outcome.solved, None);
        assert_eq!(outcome.points_awarded, 0);
        assert_eq!(state.solved_count(), 1);
        assert_eq!(state.score(), POINTS_NO_HINT);
    }

    #[test]
    fn test_wrong_answer_changes_nothing() {
        let mut state = puzzle_state("Cryo Chamber");
        let outcome = ReplyPolicy::default().apply("That's incorrect, try again!", &mut state, ReplyContext::default());

        assert!(outcome.applied.is_empty());
        assert_eq!(state.current_element(), Some("Cryo Chamber"));
        assert_eq!(state.solved_count(), 0);
    }

    #[test]
    fn test_theme_reoffer_is_replaced_with_template() {
        let mut state = SessionState::new();
        state.select_theme("Castle");
        let reply = "Great choice! Pick a theme:\n1. **Castle**\n2. **Jungle**\n3. **Moon Base**\n4. **Pirate Ship**";

        let outcome = ReplyPolicy::default().apply(reply, &mut state, ReplyContext { just_selected_theme: true });

        assert_eq!(outcome.applied, vec![ReplyRule::ReplaceThemeReoffer]);
        assert!(outcome.text.starts_with("Welcome to the Castle!"));
        assert_eq!(state.last_elements(), FALLBACK_ELEMENTS.map(String::from).as_slice());
    }

    #[test]
    fn test_three_elements_after_theme_are_kept() {
        let mut state = SessionState::new();
        state.select_theme("Castle");
        let reply = "The hall is cold.\n1. **Throne**\n2. **Armor**\n3. **Tapestry**";

        let outcome = ReplyPolicy::default().apply(reply, &mut state, ReplyContext { just_selected_theme: true });

        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.text, reply);
    }

    #[test]
    fn test_reoffer_rule_only_runs_right_after_theme_pick() {
        let mut state = SessionState::new();
        state.select_theme("Castle");
        let reply = "1. **A**\n2. **B**\n3. **C**\n4. **D**";

        let outcome = ReplyPolicy::default().apply(reply, &mut state, ReplyContext::default());

        assert!(!outcome.applied.contains(&ReplyRule::ReplaceThemeReoffer));
    }

    #[test]
    fn test_policy_with_subset_of_rules() {
        let mut state = puzzle_state("Cryo Chamber");
        let policy = ReplyPolicy::new(vec![ReplyRule::StripScoreMarkup]);
        let outcome = policy.apply("Correct!\nScore: 10", &mut state, ReplyContext::default());

        assert_eq!(outcome.text, "Correct!");
        assert_eq!(outcome.applied, vec![ReplyRule::StripScoreMarkup]);
        assert_eq!(state.solved_count(), 0);
    }
}
