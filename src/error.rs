//! Error types for the companion core
//!
//! Collaborator failures (`StoreError`, `AiError`) are wrapped into one of the
//! turn/session failure kinds below before they reach the UI state.

use crate::llm::AiError;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by the message store
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures surfaced by the session controller and the turn executor
#[derive(Debug, Clone, Error)]
pub enum CompanionError {
    /// Session bootstrap failed; no session exists
    #[error("Failed to create session: {0}")]
    SessionCreation(#[source] StoreError),

    /// Step 1 failed; nothing was written
    #[error("Failed to send message: {0}")]
    UserMessageSend(#[source] StoreError),

    /// Step 2 failed; the user message is already committed
    #[error("Milo could not reply: {0}")]
    AiGeneration(#[source] AiError),

    /// Step 3 failed; the generated reply is discarded
    #[error("Failed to save Milo's reply: {0}")]
    AiPersist(#[source] StoreError),

    /// Live feed subscription could not be opened
    #[error("Failed to observe messages: {0}")]
    FeedSubscription(#[source] StoreError),
}

impl CompanionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompanionError::SessionCreation(_) => ErrorKind::SessionCreation,
            CompanionError::UserMessageSend(_) => ErrorKind::UserMessageSend,
            CompanionError::AiGeneration(_) => ErrorKind::AiGeneration,
            CompanionError::AiPersist(_) => ErrorKind::AiPersist,
            CompanionError::FeedSubscription(_) => ErrorKind::FeedSubscription,
        }
    }
}

/// Classification exposed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SessionCreation,
    UserMessageSend,
    AiGeneration,
    AiPersist,
    FeedSubscription,
}
