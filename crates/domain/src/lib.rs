//! Escape Room Guide domain.
//!
//! Pure, synchronous game logic with no I/O:
//!
//! - `session` - per-browser-session game state and its invariants
//! - `candidates` - theme/element names parsed from the guide's replies
//! - `fuzzy` - free-text selection against offered names
//! - `intent` - named guards over user input
//! - `resolver` - the turn state machine
//! - `reply_policy` - post-validation rules applied to every reply
//! - `prompt` - system prompt construction

pub mod candidates;
pub mod error;
pub mod fuzzy;
pub mod intent;
pub mod prompt;
pub mod reply_policy;
pub mod resolver;
pub mod session;

pub use candidates::{extract_candidates, looks_like_theme_list};
pub use error::DomainError;
pub use fuzzy::{partial_ratio, FuzzyMatch, FuzzyMatcher, ELEMENT_MATCH_THRESHOLD, THEME_MATCH_THRESHOLD};
pub use intent::{classify, Intent};
pub use prompt::{build_system_prompt, WELCOME_MESSAGE};
pub use reply_policy::{
    contains_disallowed_script, ReplyContext, ReplyOutcome, ReplyPolicy, ReplyRule,
    LANGUAGE_REDIRECT_MESSAGE,
};
pub use resolver::{CandidateRefresh, TurnPlan, TurnResolver, UpstreamPrompt, MAX_INPUT_CHARS};
pub use session::{
    ChatRole, ChatTurn, DifficultyTier, GamePhase, HistoryWindow, SessionState,
    DEFAULT_MAX_HISTORY_MESSAGES,
};
