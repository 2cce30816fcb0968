//! Escape-room game use cases.
//!
//! The flow for one browser session is:
//! 1. Landing on the page resets the session (StartGame)
//! 2. Each chat message runs one turn (PlayTurn)
//! 3. A turn that picks a theme also illustrates it (IllustrateTheme)

use std::sync::Arc;

mod illustrate;
mod play_turn;
mod start;

pub use illustrate::{theme_image_request, IllustrateTheme};
pub use play_turn::{ChatSettings, PlayTurn, TurnError, TurnResult};
pub use start::StartGame;

/// Container for game use cases.
pub struct GameUseCases {
    pub start: Arc<StartGame>,
    pub play_turn: Arc<PlayTurn>,
}

impl GameUseCases {
    pub fn new(start: Arc<StartGame>, play_turn: Arc<PlayTurn>) -> Self {
        Self { start, play_turn }
    }
}
