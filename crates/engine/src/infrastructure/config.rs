//! Application configuration

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::infrastructure::huggingface::DEFAULT_HF_API_URL;
use crate::infrastructure::openrouter::{DEFAULT_CHAT_BASE_URL, DEFAULT_CHAT_MODEL};
use crate::stores::session::DEFAULT_SESSION_IDLE_TTL_SECS;

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,

    /// CORS allowed origins (comma-separated, or "*" for any); unset disables CORS
    pub cors_allowed_origins: Option<String>,

    /// Chat completion configuration
    pub chat: ChatConfig,

    /// Image generation configuration
    pub image: ImageConfig,

    /// Session configuration
    pub session: SessionConfig,
}

/// Upstream chat configuration
#[derive(Clone)]
pub struct ChatConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,
    pub model: String,
    /// Rotated on every attempt
    pub api_keys: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Fraction of the retry delay randomised either way (0.0 = fixed)
    pub retry_jitter: f64,
    pub timeout_secs: u64,
}

/// Upstream image configuration
#[derive(Clone)]
pub struct ImageConfig {
    pub api_url: String,
    /// Empty means every image is the local placeholder
    pub api_keys: Vec<String>,
    pub timeout_secs: u64,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chat messages kept and replayed per session (0 = unbounded)
    pub max_history_messages: usize,
    /// Idle time before a session is dropped
    pub idle_ttl_secs: u64,
    /// How often expired sessions are swept
    pub cleanup_interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| -> String {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let chat_keys = key_list(&lookup, "OPENROUTER_API_KEYS", "OPENROUTER_API_KEY");
        if chat_keys.is_empty() {
            bail!("OPENROUTER_API_KEYS (or OPENROUTER_API_KEY) must hold at least one key");
        }

        Ok(Self {
            server_host: var("SERVER_HOST", "0.0.0.0"),
            server_port: parse(&var("SERVER_PORT", "8000"), "SERVER_PORT")?,

            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),

            chat: ChatConfig {
                base_url: var("CHAT_API_BASE_URL", DEFAULT_CHAT_BASE_URL),
                model: var("CHAT_MODEL", DEFAULT_CHAT_MODEL),
                api_keys: chat_keys,
                temperature: parse(&var("CHAT_TEMPERATURE", "0.8"), "CHAT_TEMPERATURE")?,
                max_tokens: parse(&var("CHAT_MAX_TOKENS", "400"), "CHAT_MAX_TOKENS")?,
                max_retries: parse(&var("CHAT_MAX_RETRIES", "3"), "CHAT_MAX_RETRIES")?,
                retry_delay_ms: parse(&var("CHAT_RETRY_DELAY_MS", "1000"), "CHAT_RETRY_DELAY_MS")?,
                retry_jitter: parse(&var("CHAT_RETRY_JITTER", "0"), "CHAT_RETRY_JITTER")?,
                timeout_secs: parse(&var("CHAT_TIMEOUT_SECS", "60"), "CHAT_TIMEOUT_SECS")?,
            },

            image: ImageConfig {
                api_url: var("HF_API_URL", DEFAULT_HF_API_URL),
                api_keys: key_list(&lookup, "HF_API_KEYS", "HF_API_KEY"),
                timeout_secs: parse(&var("IMAGE_TIMEOUT_SECS", "30"), "IMAGE_TIMEOUT_SECS")?,
            },

            session: SessionConfig {
                max_history_messages: parse(
                    &var("SESSION_MAX_HISTORY_MESSAGES", "40"),
                    "SESSION_MAX_HISTORY_MESSAGES",
                )?,
                idle_ttl_secs: parse(
                    &var(
                        "SESSION_IDLE_TTL_SECS",
                        &DEFAULT_SESSION_IDLE_TTL_SECS.to_string(),
                    ),
                    "SESSION_IDLE_TTL_SECS",
                )?,
                cleanup_interval_secs: parse(
                    &var("SESSION_CLEANUP_INTERVAL_SECS", "60"),
                    "SESSION_CLEANUP_INTERVAL_SECS",
                )?,
            },
        })
    }
}

fn parse<T>(raw: &str, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("{name} has an invalid value: {raw:?}"))
}

/// Comma-separated list under `plural`, else the single key under `singular`.
fn key_list<F>(lookup: &F, plural: &str, singular: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let split = |raw: String| -> Vec<String> {
        raw.split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    };

    let keys = lookup(plural).map(split).unwrap_or_default();
    if keys.is_empty() {
        lookup(singular).map(split).unwrap_or_default()
    } else {
        keys
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_keys", &format_args!("<{} redacted>", self.api_keys.len()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("retry_jitter", &self.retry_jitter)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for ImageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageConfig")
            .field("api_url", &self.api_url)
            .field("api_keys", &format_args!("<{} redacted>", self.api_keys.len()))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-one")]).unwrap();

        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.chat.base_url, DEFAULT_CHAT_BASE_URL);
        assert_eq!(config.chat.model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.chat.api_keys, vec!["sk-one"]);
        assert_eq!(config.chat.temperature, 0.8);
        assert_eq!(config.chat.max_tokens, 400);
        assert_eq!(config.chat.max_retries, 3);
        assert_eq!(config.chat.retry_delay_ms, 1000);
        assert_eq!(config.chat.retry_jitter, 0.0);
        assert_eq!(config.image.api_url, DEFAULT_HF_API_URL);
        assert!(config.image.api_keys.is_empty());
        assert_eq!(config.image.timeout_secs, 30);
        assert_eq!(config.session.max_history_messages, 40);
        assert_eq!(config.session.idle_ttl_secs, 7200);
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn key_lists_prefer_plural_variable() {
        let config = config_from(&[
            ("OPENROUTER_API_KEYS", "a, b,,c"),
            ("OPENROUTER_API_KEY", "ignored"),
            ("HF_API_KEY", "hf-single"),
        ])
        .unwrap();

        assert_eq!(config.chat.api_keys, vec!["a", "b", "c"]);
        assert_eq!(config.image.api_keys, vec!["hf-single"]);
    }

    #[test]
    fn retry_jitter_is_read() {
        let config =
            config_from(&[("OPENROUTER_API_KEY", "k"), ("CHAT_RETRY_JITTER", "0.2")]).unwrap();
        assert_eq!(config.chat.retry_jitter, 0.2);
    }

    #[test]
    fn missing_chat_key_is_an_error() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("OPENROUTER_API_KEYS", " , ")]).is_err());
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let result = config_from(&[("OPENROUTER_API_KEY", "k"), ("SERVER_PORT", "eighty")]);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("SERVER_PORT"));
    }

    #[test]
    fn debug_output_hides_keys() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
