//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod fallback_image;
pub mod huggingface;
pub mod image_encoding;
pub mod key_pool;
pub mod openrouter;
pub mod ports;
pub mod resilient_llm;

#[cfg(test)]
pub(crate) mod test_support;
