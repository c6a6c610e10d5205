//! Runtime for driving a companion session
//!
//! The controller owns the UI state, the bridge feeds it from the store's live
//! subscription, and the executor runs one turn at a time.

mod bridge;
mod controller;
mod executor;
pub mod traits;
mod ui_state;

#[cfg(test)]
pub mod testing;

pub use bridge::MessageStreamBridge;
pub use controller::{IgnoreReason, SendOutcome, SessionController};
pub use executor::{TurnExecutor, TurnOutcome};
pub use traits::*;
pub use ui_state::{ErrorNotice, StateStream, UiState};

use crate::llm::LoggingAiClient;

/// Type alias for the production controller with concrete implementations
pub type ProductionController = SessionController<DatabaseRepository, LoggingAiClient>;
