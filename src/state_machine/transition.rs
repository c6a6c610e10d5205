//! Pure turn transition function

use super::{TurnEffect, TurnEvent, TurnPhase, TurnState};
use crate::error::CompanionError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<TurnEffect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: TurnEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Turn already finished ({0})")]
    TurnFinished(TurnPhase),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs no
/// I/O. Steps can only advance in order; a result event for any step other
/// than the current one is rejected.
pub fn transition(state: &TurnState, event: TurnEvent) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Idle + Begin -> UserPersisting (step 1)
        (TurnState::Idle, TurnEvent::Begin { content }) => {
            Ok(TransitionResult::new(TurnState::UserPersisting {
                content: content.clone(),
            })
            .with_effect(TurnEffect::PersistUserMessage { content }))
        }

        // UserPersisting + UserPersisted -> AwaitingAiResponse (step 2)
        (TurnState::UserPersisting { content }, TurnEvent::UserPersisted { message }) => {
            Ok(TransitionResult::new(TurnState::AwaitingAiResponse {
                user_message: message,
            })
            .with_effect(TurnEffect::GenerateReply {
                content: content.clone(),
            }))
        }

        // UserPersisting + UserPersistFailed -> Failed, nothing committed
        (TurnState::UserPersisting { .. }, TurnEvent::UserPersistFailed { error }) => {
            Ok(TransitionResult::new(TurnState::Failed {
                error: CompanionError::UserMessageSend(error),
                user_message: None,
            }))
        }

        // AwaitingAiResponse + AiReplied -> AiPersisting (step 3)
        (TurnState::AwaitingAiResponse { user_message }, TurnEvent::AiReplied { reply }) => {
            Ok(TransitionResult::new(TurnState::AiPersisting {
                user_message: user_message.clone(),
                reply: reply.clone(),
            })
            .with_effect(TurnEffect::PersistAiReply { reply }))
        }

        // AwaitingAiResponse + AiFailed -> Failed, user message stays committed
        (TurnState::AwaitingAiResponse { user_message }, TurnEvent::AiFailed { error }) => {
            Ok(TransitionResult::new(TurnState::Failed {
                error: CompanionError::AiGeneration(error),
                user_message: Some(user_message.clone()),
            }))
        }

        // AiPersisting + AiPersisted -> Completed
        (TurnState::AiPersisting { user_message, .. }, TurnEvent::AiPersisted { message }) => {
            Ok(TransitionResult::new(TurnState::Completed {
                user_message: user_message.clone(),
                ai_message: message,
            }))
        }

        // AiPersisting + AiPersistFailed -> Failed, reply discarded
        (TurnState::AiPersisting { user_message, .. }, TurnEvent::AiPersistFailed { error }) => {
            Ok(TransitionResult::new(TurnState::Failed {
                error: CompanionError::AiPersist(error),
                user_message: Some(user_message.clone()),
            }))
        }

        (TurnState::Completed { .. } | TurnState::Failed { .. }, _) => {
            Err(TransitionError::TurnFinished(state.phase()))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            state.phase(),
            event_name(&event)
        ))),
    }
}

fn event_name(event: &TurnEvent) -> &'static str {
    match event {
        TurnEvent::Begin { .. } => "begin",
        TurnEvent::UserPersisted { .. } => "user_persisted",
        TurnEvent::UserPersistFailed { .. } => "user_persist_failed",
        TurnEvent::AiReplied { .. } => "ai_replied",
        TurnEvent::AiFailed { .. } => "ai_failed",
        TurnEvent::AiPersisted { .. } => "ai_persisted",
        TurnEvent::AiPersistFailed { .. } => "ai_persist_failed",
    }
}
