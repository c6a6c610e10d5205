//! Turn executor
//!
//! Drives the pure turn state machine and performs its effects against the
//! repository and the AI client. One executor runs exactly one turn.

use super::traits::{AiClient, MessageRepository};
use crate::error::CompanionError;
use crate::models::Message;
use crate::state_machine::{transition, TransitionError, TurnEffect, TurnEvent, TurnState};

/// Result of a finished turn
#[derive(Debug)]
pub enum TurnOutcome {
    Completed {
        user_message: Message,
        ai_message: Message,
    },
    Failed {
        error: CompanionError,
        /// Present when the user message was committed before the failure
        user_message: Option<Message>,
    },
}

/// Executes a single conversational turn
pub struct TurnExecutor<'a, R: ?Sized, A: ?Sized> {
    repository: &'a R,
    ai_client: &'a A,
    session_id: &'a str,
    user_id: &'a str,
    /// Conversation as known when the turn started; never re-fetched
    history: Vec<Message>,
    state: TurnState,
}

impl<'a, R, A> TurnExecutor<'a, R, A>
where
    R: MessageRepository + ?Sized,
    A: AiClient + ?Sized,
{
    pub fn new(
        repository: &'a R,
        ai_client: &'a A,
        session_id: &'a str,
        user_id: &'a str,
        history: Vec<Message>,
    ) -> Self {
        Self {
            repository,
            ai_client,
            session_id,
            user_id,
            history,
            state: TurnState::Idle,
        }
    }

    /// Run the turn to a terminal state.
    ///
    /// Collaborator failures end in [`TurnOutcome::Failed`]; `Err` only means
    /// the state machine rejected an event, which the executor never produces.
    pub async fn run(mut self, content: String) -> Result<TurnOutcome, TransitionError> {
        tracing::info!(session_id = %self.session_id, "Starting turn");

        let mut events_to_process = vec![TurnEvent::Begin { content }];

        while let Some(event) = events_to_process.pop() {
            // Pure state transition
            let result = transition(&self.state, event)?;

            let old_phase = self.state.phase();
            self.state = result.new_state;
            tracing::debug!(
                session_id = %self.session_id,
                from = %old_phase,
                to = %self.state.phase(),
                "Turn transition"
            );

            // Execute effects and collect generated events
            for effect in result.effects {
                let generated = self.execute_effect(effect).await;
                events_to_process.push(generated);
            }
        }

        match self.state {
            TurnState::Completed {
                user_message,
                ai_message,
            } => {
                tracing::info!(session_id = %self.session_id, "Turn completed");
                Ok(TurnOutcome::Completed {
                    user_message,
                    ai_message,
                })
            }
            TurnState::Failed {
                error,
                user_message,
            } => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %error,
                    user_message_committed = user_message.is_some(),
                    "Turn failed"
                );
                Ok(TurnOutcome::Failed {
                    error,
                    user_message,
                })
            }
            other => Err(TransitionError::InvalidTransition(format!(
                "turn stopped in non-terminal state {}",
                other.phase()
            ))),
        }
    }

    /// Execute an effect and return the event describing its result
    async fn execute_effect(&self, effect: TurnEffect) -> TurnEvent {
        match effect {
            TurnEffect::PersistUserMessage { content } => {
                match self
                    .repository
                    .send_message(self.session_id, &content, self.user_id)
                    .await
                {
                    Ok(message) => TurnEvent::UserPersisted { message },
                    Err(error) => {
                        tracing::error!(session_id = %self.session_id, error = %error, "Failed to persist user message");
                        TurnEvent::UserPersistFailed { error }
                    }
                }
            }

            TurnEffect::GenerateReply { content } => {
                match self
                    .ai_client
                    .generate_response(&self.history, &content)
                    .await
                {
                    Ok(reply) => TurnEvent::AiReplied { reply },
                    Err(error) => {
                        tracing::error!(
                            session_id = %self.session_id,
                            error = %error,
                            kind = ?error.kind,
                            "AI generation failed"
                        );
                        TurnEvent::AiFailed { error }
                    }
                }
            }

            TurnEffect::PersistAiReply { reply } => {
                match self
                    .repository
                    .save_ai_response(self.session_id, &reply.content, reply.mood)
                    .await
                {
                    Ok(message) => TurnEvent::AiPersisted { message },
                    Err(error) => {
                        tracing::error!(session_id = %self.session_id, error = %error, "Failed to persist AI reply; reply discarded");
                        TurnEvent::AiPersistFailed { error }
                    }
                }
            }
        }
    }
}
