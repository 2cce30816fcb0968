//! Session-scoped game state.
//!
//! A [`SessionState`] belongs to exactly one browser session. It is mutated
//! by the turn resolver and replaced wholesale when the game restarts.
//! Selection fields are private so the theme/element invariant cannot be
//! broken from outside: an element can only be selected while a theme is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Default number of history messages kept and replayed per session.
pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 40;

/// Role of a message in the chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single message in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Bound on how much chat history is stored and replayed upstream.
///
/// `max_messages == 0` disables the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    max_messages: usize,
}

impl HistoryWindow {
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    pub fn unbounded() -> Self {
        Self { max_messages: 0 }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The most recent slice of `history` that fits the window.
    pub fn apply<'a>(&self, history: &'a [ChatTurn]) -> &'a [ChatTurn] {
        if self.max_messages == 0 || history.len() <= self.max_messages {
            history
        } else {
            &history[history.len() - self.max_messages..]
        }
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_MESSAGES)
    }
}

/// Puzzle difficulty derived from the player's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyTier {
    Unknown,
    Child,
    Teen,
    Adult,
}

impl DifficultyTier {
    pub fn from_age(age: Option<u32>) -> Self {
        match age {
            None => Self::Unknown,
            Some(age) if age < 10 => Self::Child,
            Some(age) if age < 16 => Self::Teen,
            Some(_) => Self::Adult,
        }
    }

    /// Instruction fragment used when building the system prompt.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Unknown => "Use medium difficulty until you know the player's age.",
            Self::Child => "Use very simple puzzles: counting, colours, easy riddles.",
            Self::Teen => "Use moderate puzzles: short riddles, simple codes, patterns.",
            Self::Adult => "Use challenging puzzles: ciphers, logic grids, lateral thinking.",
        }
    }
}

/// Phase of the game, derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    AwaitingAge,
    ThemeSelection,
    ElementSelection,
    PuzzleActive,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingAge => "awaiting_age",
            Self::ThemeSelection => "theme_selection",
            Self::ElementSelection => "element_selection",
            Self::PuzzleActive => "puzzle_active",
        }
    }
}

/// All state owned by one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    chat_history: Vec<ChatTurn>,
    current_theme: Option<String>,
    current_element: Option<String>,
    last_themes: Vec<String>,
    last_elements: Vec<String>,
    /// Lowercased, trimmed element names.
    solved_elements: BTreeSet<String>,
    used_hint: bool,
    player_age: Option<u32>,
    age_requested: bool,
    themes_shown: bool,
    last_image_theme: Option<String>,
    score: u32,
}

/// Case-normalized form used for solved-element bookkeeping.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state whose transcript starts with the guide's welcome message.
    pub fn with_welcome(welcome: impl Into<String>) -> Self {
        Self {
            chat_history: vec![ChatTurn::assistant(welcome)],
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Transcript
    // -------------------------------------------------------------------------

    pub fn history(&self) -> &[ChatTurn] {
        &self.chat_history
    }

    /// Append a message, dropping the oldest entries beyond `window`.
    pub fn push_turn(&mut self, turn: ChatTurn, window: HistoryWindow) {
        self.chat_history.push(turn);
        let max = window.max_messages();
        if max > 0 && self.chat_history.len() > max {
            let excess = self.chat_history.len() - max;
            self.chat_history.drain(0..excess);
        }
    }

    /// Content of the final transcript entry when the assistant spoke last.
    pub fn last_assistant_message(&self) -> Option<&str> {
        self.chat_history
            .last()
            .filter(|turn| turn.role == ChatRole::Assistant)
            .map(|turn| turn.content.as_str())
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn current_theme(&self) -> Option<&str> {
        self.current_theme.as_deref()
    }

    pub fn current_element(&self) -> Option<&str> {
        self.current_element.as_deref()
    }

    /// Select a theme. Any element and element list from a previous theme
    /// are dropped.
    pub fn select_theme(&mut self, theme: impl Into<String>) {
        self.current_theme = Some(theme.into());
        self.current_element = None;
        self.last_elements.clear();
        self.used_hint = false;
    }

    /// Select an element within the current theme.
    pub fn select_element(&mut self, element: impl Into<String>) -> Result<(), DomainError> {
        if self.current_theme.is_none() {
            return Err(DomainError::invalid_transition(
                "cannot select an element before a theme",
            ));
        }
        let element = element.into();
        if self.current_element.as_deref() != Some(element.as_str()) {
            self.used_hint = false;
        }
        self.current_element = Some(element);
        Ok(())
    }

    pub fn clear_element(&mut self) {
        self.current_element = None;
    }

    /// Forget the current theme so a new one can be chosen.
    pub fn reset_theme(&mut self) {
        self.current_theme = None;
        self.current_element = None;
        self.last_image_theme = None;
        self.themes_shown = false;
        self.last_themes.clear();
    }

    // -------------------------------------------------------------------------
    // Candidate lists
    // -------------------------------------------------------------------------

    pub fn last_themes(&self) -> &[String] {
        &self.last_themes
    }

    /// Replace the offered theme list. Marks themes as shown.
    pub fn replace_last_themes(&mut self, themes: Vec<String>) {
        self.last_themes = themes;
        self.themes_shown = true;
    }

    pub fn last_elements(&self) -> &[String] {
        &self.last_elements
    }

    pub fn replace_last_elements(&mut self, elements: Vec<String>) {
        self.last_elements = elements;
    }

    pub fn themes_shown(&self) -> bool {
        self.themes_shown
    }

    // -------------------------------------------------------------------------
    // Progress
    // -------------------------------------------------------------------------

    pub fn solved_elements(&self) -> impl Iterator<Item = &str> {
        self.solved_elements.iter().map(String::as_str)
    }

    pub fn solved_count(&self) -> usize {
        self.solved_elements.len()
    }

    pub fn is_solved(&self, element: &str) -> bool {
        self.solved_elements.contains(&normalize_name(element))
    }

    /// Record `element` as solved. Returns `false` when it already was.
    pub fn mark_solved(&mut self, element: &str) -> bool {
        self.solved_elements.insert(normalize_name(element))
    }

    /// First offered element the player has not solved yet.
    pub fn first_unsolved_element(&self) -> Option<&str> {
        self.last_elements
            .iter()
            .find(|element| !self.is_solved(element))
            .map(String::as_str)
    }

    pub fn used_hint(&self) -> bool {
        self.used_hint
    }

    pub fn set_used_hint(&mut self, used: bool) {
        self.used_hint = used;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    // -------------------------------------------------------------------------
    // Player profile
    // -------------------------------------------------------------------------

    pub fn player_age(&self) -> Option<u32> {
        self.player_age
    }

    pub fn set_player_age(&mut self, age: u32) {
        self.player_age = Some(age);
        self.age_requested = false;
    }

    pub fn age_requested(&self) -> bool {
        self.age_requested
    }

    pub fn request_age(&mut self) {
        self.age_requested = true;
    }

    pub fn difficulty(&self) -> DifficultyTier {
        DifficultyTier::from_age(self.player_age)
    }

    // -------------------------------------------------------------------------
    // Images
    // -------------------------------------------------------------------------

    pub fn last_image_theme(&self) -> Option<&str> {
        self.last_image_theme.as_deref()
    }

    pub fn set_last_image_theme(&mut self, theme: impl Into<String>) {
        self.last_image_theme = Some(theme.into());
    }

    /// Phase derived from the selection flags.
    pub fn phase(&self) -> GamePhase {
        match (&self.current_theme, &self.current_element) {
            (Some(_), Some(_)) => GamePhase::PuzzleActive,
            (Some(_), None) => GamePhase::ElementSelection,
            (None, _) if self.player_age.is_none() && self.age_requested => {
                GamePhase::AwaitingAge
            }
            (None, _) => GamePhase::ThemeSelection,
        }
    }
}
