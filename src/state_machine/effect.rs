//! Effects produced by turn transitions

use crate::llm::AiReply;

/// I/O the executor performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    /// Write the user's message to the store
    PersistUserMessage { content: String },

    /// Ask the AI generator for a reply to `content`, using the turn's history snapshot
    GenerateReply { content: String },

    /// Write Milo's reply and mood to the store
    PersistAiReply { reply: AiReply },
}
