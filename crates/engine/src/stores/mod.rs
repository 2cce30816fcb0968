//! In-memory state storage modules.
//!
//! - `InMemorySessionStore` - per-browser game state with idle expiry
//! - `SessionLocks` - one in-flight turn per session

pub mod session;

pub use session::{InMemorySessionStore, SessionLocks};
