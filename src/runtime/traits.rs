//! Trait abstractions for the core's collaborators
//!
//! These traits let the controller and the turn executor run against the
//! SQLite store and the HTTP AI client in production, and against in-memory
//! mocks in tests.

use crate::db::Database;
use crate::error::StoreError;
use crate::llm::{AiError, AiReply};
use crate::models::{Message, MoodPair, Session};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

/// Live subscription to a session's messages.
///
/// Each item is the complete ordered list. Dropping the stream cancels the
/// subscription.
pub type MessageFeed = BoxStream<'static, Vec<Message>>;

/// Durable message/session store with a live feed
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Create a new session owned by `user_id`
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError>;

    /// Subscribe to the full message list of a session.
    ///
    /// Each item is the complete ordered list. Feeds should open with the
    /// current list as an immediately ready first item; a feed that only
    /// emits on change is accepted, but until its first change the
    /// controller shows no messages for the session.
    async fn observe_messages(&self, session_id: &str) -> Result<MessageFeed, StoreError>;

    /// Persist a user-authored message
    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<Message, StoreError>;

    /// Persist a Milo-authored message with its mood
    async fn save_ai_response(
        &self,
        session_id: &str,
        content: &str,
        mood: MoodPair,
    ) -> Result<Message, StoreError>;
}

/// Opaque generator for Milo's replies
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Generate a reply to `user_message` given the conversation so far
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: MessageRepository + ?Sized> MessageRepository for Arc<T> {
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        (**self).create_session(user_id).await
    }

    async fn observe_messages(&self, session_id: &str) -> Result<MessageFeed, StoreError> {
        (**self).observe_messages(session_id).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<Message, StoreError> {
        (**self).send_message(session_id, content, user_id).await
    }

    async fn save_ai_response(
        &self,
        session_id: &str,
        content: &str,
        mood: MoodPair,
    ) -> Result<Message, StoreError> {
        (**self).save_ai_response(session_id, content, mood).await
    }
}

#[async_trait]
impl<T: AiClient + ?Sized> AiClient for Arc<T> {
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError> {
        (**self).generate_response(history, user_message).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use [`Database`] as a [`MessageRepository`]
#[derive(Clone)]
pub struct DatabaseRepository {
    db: Database,
}

impl DatabaseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl MessageRepository for DatabaseRepository {
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db.create_session(&id, user_id).map_err(StoreError::from)
    }

    async fn observe_messages(&self, session_id: &str) -> Result<MessageFeed, StoreError> {
        let (current, rx) = self.db.subscribe_messages(session_id)?;

        // Lagged receivers skip ahead: every item is a full list
        let updates =
            BroadcastStream::new(rx).filter_map(|result| futures::future::ready(result.ok()));

        Ok(futures::stream::once(futures::future::ready(current))
            .chain(updates)
            .boxed())
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<Message, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db
            .add_user_message(&id, session_id, content, user_id)
            .map_err(StoreError::from)
    }

    async fn save_ai_response(
        &self,
        session_id: &str,
        content: &str,
        mood: MoodPair,
    ) -> Result<Message, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db
            .add_ai_message(&id, session_id, content, mood)
            .map_err(StoreError::from)
    }
}
