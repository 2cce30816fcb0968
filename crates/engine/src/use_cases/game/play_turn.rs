//! Play turn use case.
//!
//! One chat message in, one guide reply out:
//! 1. Load the session (a missing one starts fresh)
//! 2. Let the resolver update selection state and build the prompt
//! 3. Ask the chat service (retries live in the client)
//! 4. Post-process the reply and record the exchange
//! 5. Illustrate a newly picked theme
//! 6. Save the session
//!
//! The session is written once at the end, so a failed upstream call leaves
//! the stored state untouched.

use std::sync::Arc;

use escaperoom_domain::{
    ChatRole, DomainError, GamePhase, SessionState, TurnResolver, LANGUAGE_REDIRECT_MESSAGE,
    WELCOME_MESSAGE,
};

use super::illustrate::IllustrateTheme;
use crate::infrastructure::ports::{
    ChatMessage, LlmError, LlmPort, LlmRequest, SessionId, SessionStoreError, SessionStorePort,
};

/// Sampling parameters for the guide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 400,
        }
    }
}

/// What the player sees after one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub response: String,
    pub score: u32,
    /// Base64 PNG, only on the turn a theme is picked.
    pub image: Option<String>,
    pub phase: GamePhase,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Empty input")]
    EmptyInput,
    #[error("Chat service unavailable: {0}")]
    UpstreamChatUnavailable(LlmError),
    #[error("Invalid game state: {0}")]
    Domain(#[from] DomainError),
    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),
}

pub struct PlayTurn {
    sessions: Arc<dyn SessionStorePort>,
    llm: Arc<dyn LlmPort>,
    illustrate: Arc<IllustrateTheme>,
    resolver: TurnResolver,
    chat: ChatSettings,
}

impl PlayTurn {
    pub fn new(
        sessions: Arc<dyn SessionStorePort>,
        llm: Arc<dyn LlmPort>,
        illustrate: Arc<IllustrateTheme>,
        resolver: TurnResolver,
        chat: ChatSettings,
    ) -> Self {
        Self {
            sessions,
            llm,
            illustrate,
            resolver,
            chat,
        }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        user_input: &str,
    ) -> Result<TurnResult, TurnError> {
        let input = user_input.trim();
        if input.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let mut state = match self.sessions.load(session_id).await? {
            Some(state) => state,
            None => {
                tracing::debug!(session_id = %session_id, "No stored session, starting fresh");
                SessionState::with_welcome(WELCOME_MESSAGE)
            }
        };

        let plan = self.resolver.resolve_input(&mut state, input)?;
        tracing::debug!(
            session_id = %session_id,
            intent = ?plan.intent,
            phase_before = plan.phase_before.as_str(),
            phase_after = plan.phase_after.as_str(),
            refreshed = ?plan.refreshed,
            "Resolved turn"
        );

        let prompt = self.resolver.build_prompt(&state, input);
        let request = LlmRequest::new(prompt.messages.iter().map(to_chat_message).collect())
            .with_system_prompt(prompt.system)
            .with_temperature(self.chat.temperature)
            .with_max_tokens(Some(self.chat.max_tokens));

        let response = match self.llm.generate(request).await {
            Ok(reply) => {
                let outcome = self
                    .resolver
                    .apply_reply(&mut state, &plan, input, &reply.content);
                if !outcome.applied.is_empty() {
                    let rules: Vec<&str> = outcome.applied.iter().map(|r| r.as_str()).collect();
                    tracing::info!(
                        session_id = %session_id,
                        rules = ?rules,
                        solved = ?outcome.solved,
                        points = outcome.points_awarded,
                        "Reply rules applied"
                    );
                }
                outcome.text
            }
            Err(LlmError::DisallowedLanguage) => {
                tracing::warn!(session_id = %session_id, "Guide kept answering off-language, redirecting");
                self.resolver
                    .record_exchange(&mut state, input, LANGUAGE_REDIRECT_MESSAGE);
                LANGUAGE_REDIRECT_MESSAGE.to_string()
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Chat service unavailable");
                return Err(TurnError::UpstreamChatUnavailable(e));
            }
        };

        let image = if plan.wants_image() {
            self.illustrate.execute(&mut state).await
        } else {
            None
        };

        self.sessions.save(session_id, &state).await?;

        Ok(TurnResult {
            response,
            score: state.score(),
            image,
            phase: state.phase(),
        })
    }
}

fn to_chat_message(turn: &escaperoom_domain::ChatTurn) -> ChatMessage {
    match turn.role {
        ChatRole::User => ChatMessage::user(turn.content.clone()),
        ChatRole::Assistant => ChatMessage::assistant(turn.content.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::fallback_image::generate_fallback_image;
    use crate::infrastructure::ports::{
        ImageGenError, ImageResult, LlmResponse, MessageRole, MockImageGenPort, MockLlmPort,
        MockSessionStorePort,
    };
    use crate::stores::InMemorySessionStore;
    use escaperoom_domain::HistoryWindow;

    fn reply(text: &str) -> LlmResponse {
        LlmResponse {
            content: text.to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        }
    }

    fn memory_store() -> Arc<InMemorySessionStore> {
        Arc::new(InMemorySessionStore::new(
            std::time::Duration::from_secs(3600),
            Arc::new(SystemClock::new()),
        ))
    }

    fn no_images() -> Arc<IllustrateTheme> {
        let mut image_gen = MockImageGenPort::new();
        image_gen.expect_generate().times(0);
        Arc::new(IllustrateTheme::new(Arc::new(image_gen)))
    }

    fn play_turn(
        sessions: Arc<dyn SessionStorePort>,
        llm: MockLlmPort,
        illustrate: Arc<IllustrateTheme>,
    ) -> PlayTurn {
        PlayTurn::new(
            sessions,
            Arc::new(llm),
            illustrate,
            TurnResolver::new(HistoryWindow::default()),
            ChatSettings::default(),
        )
    }

    /// Seed a session whose last guide message lists two themes.
    async fn seed_theme_offer(store: &InMemorySessionStore, id: SessionId) {
        let mut state = SessionState::with_welcome(WELCOME_MESSAGE);
        TurnResolver::default().record_exchange(
            &mut state,
            "next",
            "Choose a theme:\n1. **Space Station**\n2. **Castle**",
        );
        store.save(id, &state).await.unwrap();
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_call() {
        let mut sessions = MockSessionStorePort::new();
        sessions.expect_load().times(0);
        let mut llm = MockLlmPort::new();
        llm.expect_generate().times(0);

        let result = play_turn(Arc::new(sessions), llm, no_images())
            .execute(SessionId::new(), "   ")
            .await;

        assert!(matches!(result, Err(TurnError::EmptyInput)));
    }

    #[tokio::test]
    async fn overlong_input_is_rejected_without_upstream_call_or_save() {
        let mut sessions = MockSessionStorePort::new();
        sessions.expect_load().returning(|_| Ok(None));
        sessions.expect_save().times(0);
        let mut llm = MockLlmPort::new();
        llm.expect_generate().times(0);

        let input = "q".repeat(escaperoom_domain::MAX_INPUT_CHARS + 1);
        let result = play_turn(Arc::new(sessions), llm, no_images())
            .execute(SessionId::new(), &input)
            .await;

        assert!(matches!(
            result,
            Err(TurnError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn request_carries_system_prompt_history_and_sampling() {
        let store = memory_store();
        let id = SessionId::new();
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .withf(|req| {
                req.system_prompt
                    .as_deref()
                    .is_some_and(|s| s.contains("EscapeRoomBot"))
                    && req.temperature == Some(0.8)
                    && req.max_tokens == Some(400)
                    && req.messages.first().map(|m| m.role) == Some(MessageRole::Assistant)
                    && req.messages.last() == Some(&ChatMessage::user("hello"))
            })
            .times(1)
            .returning(|_| Ok(reply("Hello, explorer!")));

        let result = play_turn(store.clone(), llm, no_images())
            .execute(id, "  hello ")
            .await
            .unwrap();

        assert_eq!(result.response, "Hello, explorer!");
        assert_eq!(result.score, 0);
        assert!(result.image.is_none());
        let saved = store.load(id).await.unwrap().unwrap();
        assert_eq!(saved.history().len(), 3);
        assert_eq!(saved.last_assistant_message(), Some("Hello, explorer!"));
    }

    #[tokio::test]
    async fn picking_a_theme_returns_an_image() {
        let store = memory_store();
        let id = SessionId::new();
        seed_theme_offer(&store, id).await;

        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Ok(reply("Welcome to the Castle! Pick an element.")));
        let mut image_gen = MockImageGenPort::new();
        image_gen
            .expect_generate()
            .times(1)
            .returning(|_| Ok(ImageResult { base64_data: "castle-png".into() }));

        let result = play_turn(
            store.clone(),
            llm,
            Arc::new(IllustrateTheme::new(Arc::new(image_gen))),
        )
        .execute(id, "2")
        .await
        .unwrap();

        assert_eq!(result.image.as_deref(), Some("castle-png"));
        assert_eq!(result.phase, GamePhase::ElementSelection);
        let saved = store.load(id).await.unwrap().unwrap();
        assert_eq!(saved.current_theme(), Some("Castle"));
        assert_eq!(saved.current_element(), None);
        assert_eq!(saved.last_image_theme(), Some("Castle"));
    }

    #[tokio::test]
    async fn image_failure_uses_placeholder() {
        let store = memory_store();
        let id = SessionId::new();
        seed_theme_offer(&store, id).await;

        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Ok(reply("Welcome aboard the Space Station!")));
        let mut image_gen = MockImageGenPort::new();
        image_gen
            .expect_generate()
            .returning(|_| Err(ImageGenError::GenerationFailed("HTTP 503".into())));

        let result = play_turn(
            store,
            llm,
            Arc::new(IllustrateTheme::new(Arc::new(image_gen))),
        )
        .execute(id, "space station")
        .await
        .unwrap();

        assert_eq!(result.image, generate_fallback_image("Space Station").ok());
    }

    #[tokio::test]
    async fn solving_an_element_scores() {
        let store = memory_store();
        let id = SessionId::new();
        let mut state = SessionState::with_welcome(WELCOME_MESSAGE);
        state.select_theme("Castle");
        state.select_element("Throne").unwrap();
        store.save(id, &state).await.unwrap();

        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Ok(reply("Correct! The throne slides aside. Score: 10")));

        let result = play_turn(store.clone(), llm, no_images())
            .execute(id, "the crown")
            .await
            .unwrap();

        assert_eq!(result.score, 10);
        assert_eq!(result.response, "Correct! The throne slides aside.");
        let saved = store.load(id).await.unwrap().unwrap();
        assert!(saved.is_solved("throne"));
        assert_eq!(saved.current_element(), None);
    }

    #[tokio::test]
    async fn off_language_exhaustion_becomes_redirect() {
        let store = memory_store();
        let id = SessionId::new();
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Err(LlmError::DisallowedLanguage));

        let result = play_turn(store.clone(), llm, no_images())
            .execute(id, "hello")
            .await
            .unwrap();

        assert_eq!(result.response, LANGUAGE_REDIRECT_MESSAGE);
        let saved = store.load(id).await.unwrap().unwrap();
        assert_eq!(saved.last_assistant_message(), Some(LANGUAGE_REDIRECT_MESSAGE));
    }

    #[tokio::test]
    async fn chat_failure_leaves_session_untouched() {
        let store = memory_store();
        let id = SessionId::new();
        seed_theme_offer(&store, id).await;
        let before = store.load(id).await.unwrap();

        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Err(LlmError::RequestFailed("HTTP 503: busy".into())));

        let result = play_turn(store.clone(), llm, no_images())
            .execute(id, "2")
            .await;

        assert!(matches!(result, Err(TurnError::UpstreamChatUnavailable(_))));
        assert_eq!(store.load(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let mut sessions = MockSessionStorePort::new();
        sessions
            .expect_load()
            .returning(|_| Err(SessionStoreError::Unavailable("down".into())));
        let mut llm = MockLlmPort::new();
        llm.expect_generate().times(0);

        let result = play_turn(Arc::new(sessions), llm, no_images())
            .execute(SessionId::new(), "hello")
            .await;

        assert!(matches!(result, Err(TurnError::Store(_))));
    }
}
