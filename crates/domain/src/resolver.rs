//! Turn resolution: the game's state machine.
//!
//! ```text
//!            "next"            age            theme picked          element picked
//! (start) ---------> AWAITING_AGE ---> THEME_SELECTION ---> ELEMENT_SELECTION ---> PUZZLE_ACTIVE
//!                                          ^                        ^                    |
//!                                          |                        +---- solved --------+
//!                                          +------------- "change theme" (any state)
//! ```
//!
//! A turn is resolved in two halves. [`TurnResolver::resolve_input`] runs
//! before the upstream call: it classifies the message, refreshes the
//! offered candidate lists from the guide's previous reply and updates the
//! selection. [`TurnResolver::apply_reply`] runs after: it feeds the reply
//! through the [`ReplyPolicy`] and records the exchange in the transcript.

use crate::candidates::{extract_candidates, looks_like_theme_list};
use crate::error::DomainError;
use crate::fuzzy::FuzzyMatcher;
use crate::intent::{classify, parse_age, Intent};
use crate::prompt::build_system_prompt;
use crate::reply_policy::{ReplyContext, ReplyOutcome, ReplyPolicy};
use crate::session::{ChatTurn, GamePhase, HistoryWindow, SessionState};

/// Longest user message accepted, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Which candidate list was refreshed from the guide's previous reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateRefresh {
    Themes(usize),
    Elements(usize),
}

/// Decisions taken for one user message before calling upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPlan {
    pub intent: Intent,
    pub phase_before: GamePhase,
    pub phase_after: GamePhase,
    pub refreshed: Option<CandidateRefresh>,
    pub theme_reset: bool,
    pub hint_requested: bool,
    pub age_set: Option<u32>,
    pub just_selected_theme: bool,
    pub just_selected_element: bool,
}

impl TurnPlan {
    fn new(intent: Intent, phase_before: GamePhase) -> Self {
        Self {
            intent,
            phase_before,
            phase_after: phase_before,
            refreshed: None,
            theme_reset: false,
            hint_requested: false,
            age_set: None,
            just_selected_theme: false,
            just_selected_element: false,
        }
    }

    /// Images are only generated when a theme was picked this turn.
    pub fn wants_image(&self) -> bool {
        self.just_selected_theme
    }

    pub fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            just_selected_theme: self.just_selected_theme,
        }
    }
}

/// Everything sent upstream for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamPrompt {
    pub system: String,
    /// Windowed history followed by the latest user message.
    pub messages: Vec<ChatTurn>,
}

/// Stateless driver of the game state machine.
#[derive(Debug, Clone)]
pub struct TurnResolver {
    theme_matcher: FuzzyMatcher,
    element_matcher: FuzzyMatcher,
    window: HistoryWindow,
    policy: ReplyPolicy,
}

impl Default for TurnResolver {
    fn default() -> Self {
        Self::new(HistoryWindow::default())
    }
}

impl TurnResolver {
    pub fn new(window: HistoryWindow) -> Self {
        Self {
            theme_matcher: FuzzyMatcher::for_themes(),
            element_matcher: FuzzyMatcher::for_elements(),
            window,
            policy: ReplyPolicy::default(),
        }
    }

    /// Update selection state for `input` and decide what this turn needs.
    pub fn resolve_input(
        &self,
        state: &mut SessionState,
        input: &str,
    ) -> Result<TurnPlan, DomainError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DomainError::validation("user input is empty"));
        }
        if input.chars().count() > MAX_INPUT_CHARS {
            return Err(DomainError::validation(format!(
                "user input is longer than {MAX_INPUT_CHARS} characters"
            )));
        }

        let intent = classify(input);
        let mut plan = TurnPlan::new(intent, state.phase());

        if intent == Intent::ChangeTheme {
            state.reset_theme();
            plan.theme_reset = true;
            plan.phase_after = state.phase();
            return Ok(plan);
        }

        self.refresh_candidates(state, &mut plan);

        match intent {
            Intent::Hint => {
                if state.current_element().is_some() {
                    state.set_used_hint(true);
                    plan.hint_requested = true;
                }
            }
            Intent::Next if state.player_age().is_none() => state.request_age(),
            _ if state.phase() == GamePhase::AwaitingAge => {
                if let Some(age) = parse_age(input) {
                    state.set_player_age(age);
                    plan.age_set = Some(age);
                }
            }
            _ => {
                if state.current_theme().is_none() {
                    self.select_theme(state, input, intent, &mut plan);
                } else if state.current_element().is_none() {
                    self.select_element(state, input, intent, &mut plan)?;
                }
            }
        }

        plan.phase_after = state.phase();
        Ok(plan)
    }

    /// System prompt plus the message list for the upstream call.
    pub fn build_prompt(&self, state: &SessionState, input: &str) -> UpstreamPrompt {
        let mut messages: Vec<ChatTurn> = self.window.apply(state.history()).to_vec();
        messages.push(ChatTurn::user(input.trim()));
        UpstreamPrompt {
            system: build_system_prompt(state),
            messages,
        }
    }

    /// Post-process the guide's reply and record the exchange.
    pub fn apply_reply(
        &self,
        state: &mut SessionState,
        plan: &TurnPlan,
        input: &str,
        reply: &str,
    ) -> ReplyOutcome {
        let outcome = self.policy.apply(reply, state, plan.reply_context());
        self.record_exchange(state, input, &outcome.text);
        outcome
    }

    /// Append one user/assistant exchange to the transcript.
    pub fn record_exchange(&self, state: &mut SessionState, input: &str, reply: &str) {
        state.push_turn(ChatTurn::user(input.trim()), self.window);
        state.push_turn(ChatTurn::assistant(reply), self.window);
    }

    fn refresh_candidates(&self, state: &mut SessionState, plan: &mut TurnPlan) {
        let Some(last) = state.last_assistant_message().map(str::to_string) else {
            return;
        };
        let found = extract_candidates(&last);
        if found.is_empty() {
            return;
        }

        if state.current_theme().is_none() {
            if looks_like_theme_list(&last) {
                plan.refreshed = Some(CandidateRefresh::Themes(found.len()));
                state.replace_last_themes(found);
            }
        } else if state.current_element().is_none() {
            plan.refreshed = Some(CandidateRefresh::Elements(found.len()));
            state.replace_last_elements(found);
        }
    }

    fn select_theme(&self, state: &mut SessionState, input: &str, intent: Intent, plan: &mut TurnPlan) {
        let chosen = match intent {
            Intent::Number(n) => pick_by_index(state.last_themes(), n),
            Intent::FreeText => self
                .theme_matcher
                .best_match(input, state.last_themes())
                .map(|m| m.candidate.to_string()),
            _ => None,
        };
        if let Some(theme) = chosen {
            state.select_theme(theme);
            plan.just_selected_theme = true;
        }
    }

    fn select_element(
        &self,
        state: &mut SessionState,
        input: &str,
        intent: Intent,
        plan: &mut TurnPlan,
    ) -> Result<(), DomainError> {
        let chosen = match intent {
            Intent::Number(n) => pick_by_index(state.last_elements(), n),
            Intent::Affirmative => state.first_unsolved_element().map(str::to_string),
            Intent::FreeText => self
                .element_matcher
                .best_match(input, state.last_elements())
                .map(|m| m.candidate.to_string()),
            _ => None,
        };
        if let Some(element) = chosen {
            state.select_element(element)?;
            plan.just_selected_element = true;
        }
        Ok(())
    }
}

/// 1-based lookup into an offered list.
fn pick_by_index(list: &[String], n: u32) -> Option<String> {
    let index = usize::try_from(n).ok()?.checked_sub(1)?;
    list.get(index).cloned()
}
