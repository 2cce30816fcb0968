//! Start game use case.

use std::sync::Arc;

use escaperoom_domain::{SessionState, WELCOME_MESSAGE};

use crate::infrastructure::ports::{SessionId, SessionStoreError, SessionStorePort};

/// Wipes whatever the session held and seeds the welcome message.
pub struct StartGame {
    sessions: Arc<dyn SessionStorePort>,
}

impl StartGame {
    pub fn new(sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { sessions }
    }

    /// Returns the opening message shown to the player.
    pub async fn execute(&self, session_id: SessionId) -> Result<String, SessionStoreError> {
        self.sessions.flush(session_id).await?;
        self.sessions
            .save(session_id, &SessionState::with_welcome(WELCOME_MESSAGE))
            .await?;
        tracing::info!(session_id = %session_id, "Game started");
        Ok(WELCOME_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockSessionStorePort;
    use escaperoom_domain::ChatRole;
    use mockall::Sequence;

    #[tokio::test]
    async fn flushes_then_seeds_welcome() {
        let id = SessionId::new();
        let mut sessions = MockSessionStorePort::new();
        let mut seq = Sequence::new();
        sessions
            .expect_flush()
            .withf(move |sid| *sid == id)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        sessions
            .expect_save()
            .withf(move |sid, state| {
                *sid == id
                    && state.history().len() == 1
                    && state.history()[0].role == ChatRole::Assistant
                    && state.history()[0].content == WELCOME_MESSAGE
                    && state.current_theme().is_none()
                    && state.score() == 0
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let message = StartGame::new(Arc::new(sessions)).execute(id).await.unwrap();

        assert_eq!(message, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let mut sessions = MockSessionStorePort::new();
        sessions
            .expect_flush()
            .returning(|_| Err(SessionStoreError::Unavailable("down".into())));

        let result = StartGame::new(Arc::new(sessions)).execute(SessionId::new()).await;

        assert!(matches!(result, Err(SessionStoreError::Unavailable(_))));
    }
}
