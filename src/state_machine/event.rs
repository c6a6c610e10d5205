//! Events that drive a turn forward

use crate::error::StoreError;
use crate::llm::{AiError, AiReply};
use crate::models::Message;

/// Events that trigger turn transitions
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// The controller dispatched a non-blank message
    Begin { content: String },

    // Step 1 results
    UserPersisted { message: Message },
    UserPersistFailed { error: StoreError },

    // Step 2 results
    AiReplied { reply: AiReply },
    AiFailed { error: AiError },

    // Step 3 results
    AiPersisted { message: Message },
    AiPersistFailed { error: StoreError },
}
