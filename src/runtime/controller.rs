//! Session controller
//!
//! Single owner of [`UiState`]. Serializes the two intents (start a session,
//! send a message) against one state cell and exposes the snapshot stream.

use super::bridge::MessageStreamBridge;
use super::executor::{TurnExecutor, TurnOutcome};
use super::traits::{AiClient, MessageRepository};
use super::ui_state::{ErrorNotice, Flag, ScopedFlag, StateCell, StateStream, UiState};
use crate::error::CompanionError;
use crate::models::{Message, MoodPair};
use crate::persona;
use crate::state_machine::TransitionError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Why `send_message` did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Content was empty or whitespace only
    BlankContent,
    /// No session is active (never started, still starting, or ended while
    /// the turn was queued)
    NoSession,
}

/// Result of [`SessionController::send_message`]
#[derive(Debug)]
pub enum SendOutcome {
    /// No repository call was made and the state is unchanged
    Ignored(IgnoreReason),
    /// Both messages are persisted
    Completed {
        user_message: Message,
        ai_message: Message,
    },
    /// The turn failed; the error is also in `UiState::error`
    Failed(CompanionError),
    /// The turn state machine rejected an event. Indicates a bug.
    Aborted(TransitionError),
}

/// Drives one session at a time for one UI.
///
/// Turns are queued: a `send_message` issued while another turn is in flight
/// waits for it to reach `Completed` or `Failed`, and turns run in the order
/// they were issued.
pub struct SessionController<R, A> {
    repository: R,
    ai_client: A,
    cell: Arc<StateCell>,
    /// Live feed of the current session; also serializes start/end
    lifecycle: Mutex<Option<MessageStreamBridge>>,
    /// FIFO queue of turns
    turn_queue: Mutex<()>,
}

impl<R, A> SessionController<R, A>
where
    R: MessageRepository,
    A: AiClient,
{
    pub fn new(repository: R, ai_client: A) -> Self {
        Self {
            repository,
            ai_client,
            cell: StateCell::new(),
            lifecycle: Mutex::new(None),
            turn_queue: Mutex::new(()),
        }
    }

    /// Current snapshot
    pub fn state(&self) -> UiState {
        self.cell.snapshot()
    }

    /// Current snapshot followed by every later one. Never ends while the
    /// controller is alive.
    pub fn observe_state(&self) -> StateStream {
        self.cell.stream()
    }

    /// Create a session, post the greeting and start the live feed.
    ///
    /// The session id is published together with the end of loading, so no
    /// turn can start before the greeting is written.
    ///
    /// Returns the existing id if a session is already active. Only session
    /// creation failure is returned as `Err`; a failed greeting or feed
    /// subscription leaves the session in place and is reported through
    /// `UiState::error`.
    pub async fn start_session(&self, user_id: &str) -> Result<String, CompanionError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(existing) = self.cell.snapshot().session_id {
            tracing::debug!(session_id = %existing, "Session already active");
            return Ok(existing);
        }

        let loading = ScopedFlag::raise(Arc::clone(&self.cell), Flag::SessionLoading);

        let session = match self.repository.create_session(user_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to create session");
                let error = CompanionError::SessionCreation(e);
                self.surface(&error);
                return Err(error);
            }
        };
        let session_id = session.id;
        tracing::info!(session_id = %session_id, user_id = %user_id, "Session created");

        if let Err(e) = self
            .repository
            .save_ai_response(&session_id, persona::GREETING, MoodPair::GREETING)
            .await
        {
            tracing::error!(session_id = %session_id, error = %e, "Failed to post greeting");
            self.surface(&CompanionError::AiPersist(e));
        }

        match MessageStreamBridge::start(&self.repository, &session_id, Arc::clone(&self.cell))
            .await
        {
            Ok(bridge) => *lifecycle = Some(bridge),
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to observe messages");
                self.surface(&CompanionError::FeedSubscription(e));
            }
        }

        loading.lower_with(|ui| ui.session_id = Some(session_id.clone()));
        Ok(session_id)
    }

    /// Run one turn for the active session.
    ///
    /// Blank content and a missing session are ignored without touching the
    /// repository or the state.
    pub async fn send_message(&self, content: &str, user_id: &str) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::BlankContent);
        }
        if self.cell.snapshot().session_id.is_none() {
            return SendOutcome::Ignored(IgnoreReason::NoSession);
        }

        let _turn = self.turn_queue.lock().await;

        // The session may have ended while this turn was queued
        let snapshot = self.cell.snapshot();
        let Some(session_id) = snapshot.session_id else {
            return SendOutcome::Ignored(IgnoreReason::NoSession);
        };
        let history = snapshot.messages;

        let _typing = ScopedFlag::raise(Arc::clone(&self.cell), Flag::AiTyping);

        let executor = TurnExecutor::new(
            &self.repository,
            &self.ai_client,
            &session_id,
            user_id,
            history,
        );

        match executor.run(content.to_string()).await {
            Ok(TurnOutcome::Completed {
                user_message,
                ai_message,
            }) => SendOutcome::Completed {
                user_message,
                ai_message,
            },
            Ok(TurnOutcome::Failed { error, .. }) => {
                self.surface_for(&session_id, &error);
                SendOutcome::Failed(error)
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Turn aborted");
                SendOutcome::Aborted(e)
            }
        }
    }

    /// Stop the live feed and forget the session.
    ///
    /// Clears the session id, messages, typing flag and error; the mood is
    /// kept. A turn still in flight finishes against the store but no longer
    /// affects the state.
    pub async fn end_session(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Some(bridge) = lifecycle.take() {
            bridge.stop();
        }

        let state = self.cell.update(|ui| {
            ui.session_id = None;
            ui.messages.clear();
            ui.is_ai_typing = false;
            ui.error = None;
        });
        tracing::info!(mood = %state.mood, "Session ended");
    }

    fn surface(&self, error: &CompanionError) {
        let notice = ErrorNotice::from(error);
        self.cell.update(|ui| ui.error = Some(notice));
    }

    /// Surface `error` only if `session_id` is still the active session
    fn surface_for(&self, session_id: &str, error: &CompanionError) {
        let notice = ErrorNotice::from(error);
        self.cell.update(|ui| {
            if ui.session_id.as_deref() == Some(session_id) {
                ui.error = Some(notice);
            }
        });
    }
}
