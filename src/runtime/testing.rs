//! Mock implementations for testing
//!
//! These mocks let the controller, executor and bridge run without SQLite or
//! HTTP. Failures are injected one call at a time.

use super::traits::{AiClient, MessageFeed, MessageRepository};
use super::ui_state::{StateStream, UiState};
use crate::error::StoreError;
use crate::llm::{AiError, AiReply};
use crate::models::{Message, MessageRole, MoodPair, Session};
use async_trait::async_trait;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio_stream::wrappers::BroadcastStream;

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// In-memory repository
// ============================================================================

/// Repository call, as recorded by [`InMemoryRepository::ops`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOp {
    CreateSession,
    ObserveMessages,
    SendMessage(String),
    SaveAiResponse(String),
}

#[derive(Default)]
struct PendingFailures {
    create_session: Option<StoreError>,
    observe_messages: Option<StoreError>,
    send_message: Option<StoreError>,
    save_ai_response: Option<StoreError>,
}

/// Repository backed by in-memory maps with a live feed per session
pub struct InMemoryRepository {
    sessions: Mutex<HashMap<String, Session>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    feeds: Mutex<HashMap<String, broadcast::Sender<Vec<Message>>>>,
    ops: Mutex<Vec<RepoOp>>,
    failures: Mutex<PendingFailures>,
    /// Feeds skip the initial list and emit only on change
    changes_only: AtomicBool,
    /// When set, `save_ai_response` waits for `release_ai_save`
    gate_ai_saves: AtomicBool,
    ai_save_started: Semaphore,
    ai_save_gate: Semaphore,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            feeds: Mutex::new(HashMap::new()),
            ops: Mutex::new(Vec::new()),
            failures: Mutex::new(PendingFailures::default()),
            changes_only: AtomicBool::new(false),
            gate_ai_saves: AtomicBool::new(false),
            ai_save_started: Semaphore::new(0),
            ai_save_gate: Semaphore::new(0),
        }
    }

    /// Make later feeds start without the current list
    pub fn emit_changes_only(&self) {
        self.changes_only.store(true, Ordering::SeqCst);
    }

    /// Hold every later `save_ai_response` until released
    pub fn gate_ai_saves(&self) {
        self.gate_ai_saves.store(true, Ordering::SeqCst);
    }

    /// Wait until one more AI save has reached the gate
    pub async fn wait_ai_save_started(&self) {
        tokio::time::timeout(WAIT_TIMEOUT, self.ai_save_started.acquire())
            .await
            .expect("AI save never started")
            .unwrap()
            .forget();
    }

    /// Let one held AI save through
    pub fn release_ai_save(&self) {
        self.ai_save_gate.add_permits(1);
    }

    /// Stored messages of a session, in order
    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Every call made so far, in call order
    pub fn ops(&self) -> Vec<RepoOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn fail_next_create_session(&self, error: StoreError) {
        self.failures.lock().unwrap().create_session = Some(error);
    }

    pub fn fail_next_observe_messages(&self, error: StoreError) {
        self.failures.lock().unwrap().observe_messages = Some(error);
    }

    pub fn fail_next_send_message(&self, error: StoreError) {
        self.failures.lock().unwrap().send_message = Some(error);
    }

    pub fn fail_next_save_ai_response(&self, error: StoreError) {
        self.failures.lock().unwrap().save_ai_response = Some(error);
    }

    fn record(&self, op: RepoOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        user_id: Option<&str>,
        mood: Option<MoodPair>,
    ) -> Result<Message, StoreError> {
        if !self.sessions.lock().unwrap().contains_key(session_id) {
            return Err(StoreError::new(format!("session not found: {session_id}")));
        }

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            user_id: user_id.map(str::to_string),
            mood,
        };

        // Publish while holding the message lock so feed order matches write order
        let mut messages = self.messages.lock().unwrap();
        let list = messages.entry(session_id.to_string()).or_default();
        list.push(message.clone());
        if let Some(tx) = self.feeds.lock().unwrap().get(session_id) {
            let _ = tx.send(list.clone());
        }
        Ok(message)
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository {
    async fn create_session(&self, user_id: &str) -> Result<Session, StoreError> {
        self.record(RepoOp::CreateSession);
        if let Some(error) = self.failures.lock().unwrap().create_session.take() {
            return Err(error);
        }

        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn observe_messages(&self, session_id: &str) -> Result<MessageFeed, StoreError> {
        self.record(RepoOp::ObserveMessages);
        if let Some(error) = self.failures.lock().unwrap().observe_messages.take() {
            return Err(error);
        }
        if !self.sessions.lock().unwrap().contains_key(session_id) {
            return Err(StoreError::new(format!("session not found: {session_id}")));
        }

        let messages = self.messages.lock().unwrap();
        let current = messages.get(session_id).cloned().unwrap_or_default();
        let rx = self
            .feeds
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe();
        drop(messages);

        let updates =
            BroadcastStream::new(rx).filter_map(|result| futures::future::ready(result.ok()));
        if self.changes_only.load(Ordering::SeqCst) {
            return Ok(updates.boxed());
        }
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
        self.record(RepoOp::SendMessage(content.to_string()));
        if let Some(error) = self.failures.lock().unwrap().send_message.take() {
            return Err(error);
        }
        self.append(session_id, MessageRole::User, content, Some(user_id), None)
    }

    async fn save_ai_response(
        &self,
        session_id: &str,
        content: &str,
        mood: MoodPair,
    ) -> Result<Message, StoreError> {
        self.record(RepoOp::SaveAiResponse(content.to_string()));
        if self.gate_ai_saves.load(Ordering::SeqCst) {
            self.ai_save_started.add_permits(1);
            self.ai_save_gate.acquire().await.unwrap().forget();
        }
        if let Some(error) = self.failures.lock().unwrap().save_ai_response.take() {
            return Err(error);
        }
        self.append(session_id, MessageRole::Ai, content, None, Some(mood))
    }
}

// ============================================================================
// Mock AI clients
// ============================================================================

/// What the AI client was asked
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub history: Vec<Message>,
    pub user_message: String,
}

/// AI client that returns queued replies in order
pub struct MockAiClient {
    replies: Mutex<VecDeque<Result<AiReply, AiError>>>,
    requests: Mutex<Vec<AiRequest>>,
}

impl MockAiClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: AiReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: AiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<AiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiClient for MockAiClient {
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError> {
        self.requests.lock().unwrap().push(AiRequest {
            history: history.to_vec(),
            user_message: user_message.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::unknown("No mock reply queued")))
    }
}

/// AI client that holds every call until the test releases it
pub struct GatedAiClient {
    inner: MockAiClient,
    started: Semaphore,
    gate: Semaphore,
}

impl GatedAiClient {
    pub fn new() -> Self {
        Self {
            inner: MockAiClient::new(),
            started: Semaphore::new(0),
            gate: Semaphore::new(0),
        }
    }

    pub fn queue_reply(&self, reply: AiReply) {
        self.inner.queue_reply(reply);
    }

    pub fn recorded_requests(&self) -> Vec<AiRequest> {
        self.inner.recorded_requests()
    }

    /// Wait until one more call has reached the gate
    pub async fn wait_started(&self) {
        tokio::time::timeout(WAIT_TIMEOUT, self.started.acquire())
            .await
            .expect("AI call never started")
            .unwrap()
            .forget();
    }

    /// Let one waiting (or future) call through
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl AiClient for GatedAiClient {
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError> {
        self.started.add_permits(1);
        self.gate.acquire().await.unwrap().forget();
        self.inner.generate_response(history, user_message).await
    }
}

// ============================================================================
// State stream helpers
// ============================================================================

/// Later snapshots from a raw receiver
pub fn snapshots(rx: broadcast::Receiver<UiState>) -> StateStream {
    BroadcastStream::new(rx)
        .filter_map(|result| futures::future::ready(result.ok()))
        .boxed()
}

/// Next snapshot satisfying `pred`, failing the test after a timeout
pub async fn wait_for<S>(states: &mut S, pred: impl Fn(&UiState) -> bool) -> UiState
where
    S: Stream<Item = UiState> + Unpin,
{
    let search = async {
        while let Some(state) = states.next().await {
            if pred(&state) {
                return state;
            }
        }
        panic!("state stream ended");
    };
    tokio::time::timeout(WAIT_TIMEOUT, search)
        .await
        .expect("timed out waiting for state")
}

/// Snapshots already emitted, without waiting for more
pub fn drain_ready<S>(states: &mut S) -> Vec<UiState>
where
    S: Stream<Item = UiState> + Unpin,
{
    use futures::FutureExt;

    let mut drained = Vec::new();
    while let Some(Some(state)) = states.next().now_or_never() {
        drained.push(state);
    }
    drained
}
