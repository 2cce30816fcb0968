//! Application state and composition.

use std::sync::Arc;

use escaperoom_domain::{HistoryWindow, TurnResolver};

use crate::infrastructure::ports::{ImageGenPort, LlmPort, SessionStorePort};
use crate::stores::SessionLocks;
use crate::use_cases::game::{ChatSettings, GameUseCases, IllustrateTheme, PlayTurn, StartGame};

/// Tunables that shape a game turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameSettings {
    pub chat: ChatSettings,
    pub history_window: HistoryWindow,
}

/// Main application state.
///
/// Holds the use cases and the per-session turn locks.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
    pub session_locks: SessionLocks,
}

/// Container for all use cases.
pub struct UseCases {
    pub game: GameUseCases,
}

impl App {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        image_gen: Arc<dyn ImageGenPort>,
        sessions: Arc<dyn SessionStorePort>,
        settings: GameSettings,
    ) -> Self {
        let illustrate = Arc::new(IllustrateTheme::new(image_gen));
        let start = Arc::new(StartGame::new(sessions.clone()));
        let play_turn = Arc::new(PlayTurn::new(
            sessions,
            llm,
            illustrate,
            TurnResolver::new(settings.history_window),
            settings.chat,
        ));

        Self {
            use_cases: UseCases {
                game: GameUseCases::new(start, play_turn),
            },
            session_locks: SessionLocks::new(),
        }
    }
}
