//! Escape Room Guide engine library.
//!
//! ## Structure
//!
//! - `use_cases/` - Turn orchestration across stores and upstream services
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `stores/` - In-memory runtime state
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
