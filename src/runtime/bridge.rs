//! Live message feed to UI state

use super::traits::MessageRepository;
use super::ui_state::StateCell;
use crate::error::StoreError;
use futures::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

static NEXT_FEED_ID: AtomicU64 = AtomicU64::new(1);

/// Subscription to one session's live feed.
///
/// Every emission replaces the controller's message list wholesale. Stopping
/// (or dropping) the bridge cancels the subscription; once `stop` returns no
/// further emission reaches the state. The bridge never resubscribes.
pub struct MessageStreamBridge {
    session_id: String,
    feed_id: u64,
    cell: Arc<StateCell>,
    cancel: CancellationToken,
}

impl MessageStreamBridge {
    pub(crate) async fn start<R>(
        repository: &R,
        session_id: &str,
        cell: Arc<StateCell>,
    ) -> Result<Self, StoreError>
    where
        R: MessageRepository + ?Sized,
    {
        let mut feed = repository.observe_messages(session_id).await?;

        let feed_id = NEXT_FEED_ID.fetch_add(1, Ordering::Relaxed);
        cell.attach_feed(feed_id);

        // Apply the current list now if the feed already has it, so callers
        // see the session's existing messages on return. A feed that only
        // emits on change is left to the task.
        if let Some(Some(initial)) = feed.next().now_or_never() {
            cell.apply_feed(feed_id, initial);
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_cell = Arc::clone(&cell);
        let task_session = session_id.to_string();

        tokio::spawn(async move {
            tracing::debug!(session_id = %task_session, feed_id, "Message feed started");
            loop {
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => break,
                    next = feed.next() => match next {
                        Some(messages) => {
                            let count = messages.len();
                            if !task_cell.apply_feed(feed_id, messages) {
                                break;
                            }
                            tracing::trace!(session_id = %task_session, count, "Applied message snapshot");
                        }
                        None => {
                            tracing::warn!(session_id = %task_session, "Message feed ended upstream");
                            break;
                        }
                    },
                }
            }
            tracing::debug!(session_id = %task_session, feed_id, "Message feed stopped");
        });

        Ok(Self {
            session_id: session_id.to_string(),
            feed_id,
            cell,
            cancel,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cancel the subscription. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.cell.detach_feed(self.feed_id);
    }
}

impl Drop for MessageStreamBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
