//! Escape Room Guide engine - main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use escaperoom_domain::HistoryWindow;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use escaperoom_engine::app::{App, GameSettings};
use escaperoom_engine::infrastructure::{
    clock::SystemClock,
    config::AppConfig,
    huggingface::HuggingFaceClient,
    key_pool::KeyPool,
    openrouter::OpenRouterClient,
    ports::ClockPort,
    resilient_llm::{ResilientLlmClient, RetryConfig},
};
use escaperoom_engine::stores::InMemorySessionStore;
use escaperoom_engine::use_cases::game::ChatSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "escaperoom_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Escape Room Guide engine");

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    // Create infrastructure clients
    let chat_client = Arc::new(OpenRouterClient::with_timeout(
        &config.chat.base_url,
        &config.chat.model,
        KeyPool::new(config.chat.api_keys.clone()),
        config.chat.timeout_secs,
    ));
    let retry_config = RetryConfig::fixed(config.chat.max_retries, config.chat.retry_delay_ms)
        .with_jitter(config.chat.retry_jitter);
    tracing::info!(
        model = %config.chat.model,
        keys = config.chat.api_keys.len(),
        max_retries = retry_config.max_retries,
        delay_ms = retry_config.delay_ms,
        jitter = retry_config.jitter_factor,
        "Chat client configured"
    );
    let llm = Arc::new(ResilientLlmClient::new(chat_client, retry_config));

    if config.image.api_keys.is_empty() {
        tracing::warn!("No image API keys configured, every illustration will be a placeholder");
    }
    let image_gen = Arc::new(HuggingFaceClient::new(
        &config.image.api_url,
        KeyPool::new(config.image.api_keys.clone()),
        config.image.timeout_secs,
    ));

    let sessions = Arc::new(InMemorySessionStore::new(
        Duration::from_secs(config.session.idle_ttl_secs),
        clock,
    ));

    let settings = GameSettings {
        chat: ChatSettings {
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
        },
        history_window: HistoryWindow::new(config.session.max_history_messages),
    };

    // Create application
    let app = Arc::new(App::new(llm, image_gen, sessions.clone(), settings));

    // Spawn idle session sweeper
    let sweep_app = app.clone();
    let sweep_interval = Duration::from_secs(config.session.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            let sessions_removed = sessions.cleanup_expired();
            let locks_removed = sweep_app.session_locks.cleanup_idle();
            if sessions_removed > 0 {
                tracing::info!(
                    sessions_removed,
                    locks_removed,
                    remaining = sessions.len(),
                    "Swept idle sessions"
                );
            }
        }
    });

    // Build router
    let mut router = escaperoom_engine::api::router(app);

    if let Some(cors) = build_cors_layer(config.cors_allowed_origins.as_deref()) {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins?;

    // The chat form posts url-encoded bodies and relies on the session cookie.
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins).allow_credentials(true);
    }

    Some(cors)
}
