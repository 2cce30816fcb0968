//! Port traits for infrastructure boundaries.
//!
//! Ports exist for:
//! - Chat completion (could swap OpenRouter -> any OpenAI-compatible endpoint)
//! - Image generation (could swap Hugging Face -> other)
//! - Session storage (could swap in-memory -> Redis)
//! - Clock (for testing)

mod error;
mod external;
mod testing;
pub mod types;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChatMessage, ImageGenPort, ImageRequest, ImageResult, LlmPort, LlmRequest, LlmResponse,
    MessageRole, SessionStorePort, TokenUsage,
};

#[cfg(test)]
pub use external::{MockImageGenPort, MockLlmPort, MockSessionStorePort};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Types
// =============================================================================
pub use types::SessionId;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ImageGenError, LlmError, SessionStoreError};
