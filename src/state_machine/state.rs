//! Turn state types

use crate::error::CompanionError;
use crate::llm::AiReply;
use crate::models::Message;
use std::fmt;

/// State of a single turn
///
/// `Idle -> UserPersisting -> AwaitingAiResponse -> AiPersisting -> Completed`,
/// with `Failed` reachable from every non-terminal state after `Idle`.
#[derive(Debug, Clone, Default)]
pub enum TurnState {
    #[default]
    Idle,

    /// Step 1: writing the user's message
    UserPersisting { content: String },

    /// Step 2: user message committed, waiting on the AI generator
    AwaitingAiResponse { user_message: Message },

    /// Step 3: writing the generated reply
    AiPersisting {
        user_message: Message,
        reply: AiReply,
    },

    Completed {
        user_message: Message,
        ai_message: Message,
    },

    Failed {
        error: CompanionError,
        /// The user message when step 1 had already committed
        user_message: Option<Message>,
    },
}

impl TurnState {
    pub fn phase(&self) -> TurnPhase {
        match self {
            TurnState::Idle => TurnPhase::Idle,
            TurnState::UserPersisting { .. } => TurnPhase::UserPersisting,
            TurnState::AwaitingAiResponse { .. } => TurnPhase::AwaitingAiResponse,
            TurnState::AiPersisting { .. } => TurnPhase::AiPersisting,
            TurnState::Completed { .. } => TurnPhase::Completed,
            TurnState::Failed { .. } => TurnPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}

/// Data-free view of [`TurnState`], used for logging and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    UserPersisting,
    AwaitingAiResponse,
    AiPersisting,
    Completed,
    Failed,
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Completed | TurnPhase::Failed)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::UserPersisting => "user_persisting",
            TurnPhase::AwaitingAiResponse => "awaiting_ai_response",
            TurnPhase::AiPersisting => "ai_persisting",
            TurnPhase::Completed => "completed",
            TurnPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
