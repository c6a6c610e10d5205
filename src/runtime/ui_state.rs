//! UI-facing state and the single-writer cell that owns it

use crate::error::{CompanionError, ErrorKind};
use crate::models::{Message, MoodPair};
use crate::mood::derive_mood;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Current snapshot followed by every later one, in emission order
pub type StateStream = BoxStream<'static, UiState>;

/// Snapshot of everything the UI renders
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UiState {
    /// `None` until a session exists
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub is_session_loading: bool,
    pub is_ai_typing: bool,
    /// Always `derive_mood(messages, previous mood)`
    pub mood: MoodPair,
    pub error: Option<ErrorNotice>,
}

/// Last failure, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CompanionError> for ErrorNotice {
    fn from(error: &CompanionError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

struct CellInner {
    ui: UiState,
    /// Feed currently allowed to replace the message list
    active_feed: Option<u64>,
}

/// Single-writer container for [`UiState`].
///
/// Every mutation happens under one lock and publishes exactly one snapshot
/// before the lock is released, so subscribers see snapshots in mutation
/// order. The lock is never held across an await point.
pub(crate) struct StateCell {
    inner: Mutex<CellInner>,
    tx: broadcast::Sender<UiState>,
}

impl StateCell {
    pub(crate) fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Arc::new(Self {
            inner: Mutex::new(CellInner {
                ui: UiState::default(),
                active_feed: None,
            }),
            tx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CellInner> {
        // A panic while holding the lock cannot leave UiState half-written:
        // mutations are plain field assignments.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> UiState {
        self.lock().ui.clone()
    }

    /// Current snapshot plus a receiver for every later one, with no gap between them
    pub(crate) fn subscribe(&self) -> (UiState, broadcast::Receiver<UiState>) {
        let inner = self.lock();
        (inner.ui.clone(), self.tx.subscribe())
    }

    /// Stream of the current snapshot and all later ones.
    ///
    /// A subscriber that falls behind by more than the channel capacity skips
    /// the snapshots it missed; each snapshot is complete, so the next one
    /// still describes the whole state.
    pub(crate) fn stream(&self) -> StateStream {
        let (initial, rx) = self.subscribe();
        let updates =
            BroadcastStream::new(rx).filter_map(|result| futures::future::ready(result.ok()));
        futures::stream::once(futures::future::ready(initial))
            .chain(updates)
            .boxed()
    }

    /// Apply `f`, re-derive the mood and publish the result
    pub(crate) fn update(&self, f: impl FnOnce(&mut UiState)) -> UiState {
        let mut inner = self.lock();
        Self::commit(&mut inner, &self.tx, f)
    }

    fn commit(
        inner: &mut CellInner,
        tx: &broadcast::Sender<UiState>,
        f: impl FnOnce(&mut UiState),
    ) -> UiState {
        f(&mut inner.ui);
        inner.ui.mood = derive_mood(&inner.ui.messages, inner.ui.mood);
        let snapshot = inner.ui.clone();
        // No receivers is fine; the snapshot is still the current state
        let _ = tx.send(snapshot.clone());
        snapshot
    }

    pub(crate) fn attach_feed(&self, feed_id: u64) {
        self.lock().active_feed = Some(feed_id);
    }

    pub(crate) fn detach_feed(&self, feed_id: u64) {
        let mut inner = self.lock();
        if inner.active_feed == Some(feed_id) {
            inner.active_feed = None;
        }
    }

    /// Replace the message list with a feed emission.
    ///
    /// Returns `false` (and changes nothing) when `feed_id` is no longer the
    /// attached feed.
    pub(crate) fn apply_feed(&self, feed_id: u64, messages: Vec<Message>) -> bool {
        let mut inner = self.lock();
        if inner.active_feed != Some(feed_id) {
            return false;
        }
        Self::commit(&mut inner, &self.tx, |ui| ui.messages = messages);
        true
    }
}

/// Boolean flags that must be released on every exit path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flag {
    SessionLoading,
    AiTyping,
}

impl Flag {
    fn set(self, ui: &mut UiState, value: bool) {
        match self {
            Flag::SessionLoading => ui.is_session_loading = value,
            Flag::AiTyping => ui.is_ai_typing = value,
        }
    }
}

/// Raises a flag on creation and lowers it on drop, whether the owning
/// future completes, fails or is dropped mid-flight.
pub(crate) struct ScopedFlag {
    cell: Arc<StateCell>,
    flag: Flag,
    raised: bool,
}

impl ScopedFlag {
    /// Raise `flag`, clearing any previous error in the same update
    pub(crate) fn raise(cell: Arc<StateCell>, flag: Flag) -> Self {
        cell.update(|ui| {
            flag.set(ui, true);
            ui.error = None;
        });
        Self {
            cell,
            flag,
            raised: true,
        }
    }

    /// Lower the flag and apply `f` in a single update
    pub(crate) fn lower_with(mut self, f: impl FnOnce(&mut UiState)) -> UiState {
        self.raised = false;
        let flag = self.flag;
        self.cell.update(|ui| {
            flag.set(ui, false);
            f(ui);
        })
    }
}

impl Drop for ScopedFlag {
    fn drop(&mut self) {
        if self.raised {
            let flag = self.flag;
            self.cell.update(|ui| flag.set(ui, false));
        }
    }
}
