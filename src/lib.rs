//! Milo companion core
//!
//! Session orchestration for a conversational companion: one controller owns
//! the UI state, turns run through an explicit state machine, and the store's
//! live feed is the single source of message ordering.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod mood;
pub mod persona;
pub mod runtime;
pub mod state_machine;

pub use config::CompanionConfig;
pub use error::{CompanionError, ErrorKind, StoreError};
pub use runtime::{ProductionController, SendOutcome, SessionController, UiState};
