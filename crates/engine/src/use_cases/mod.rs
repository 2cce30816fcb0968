//! Use cases - user story orchestration.
//!
//! Each use case pulls state from a store, runs the domain's turn logic,
//! calls upstream ports, and writes state back.

pub mod game;

pub use game::{
    GameUseCases, IllustrateTheme, PlayTurn, StartGame, TurnError, TurnResult,
};
