//! Mood derivation from the message list

use crate::models::{Message, MoodPair};

/// Mood Milo should show for `messages`.
///
/// The latest AI message decides. When there is no AI message, or the latest
/// one carries no mood, `previous` is kept as is.
pub fn derive_mood(messages: &[Message], previous: MoodPair) -> MoodPair {
    messages
        .iter()
        .rev()
        .find(|m| m.is_ai())
        .and_then(|m| m.mood)
        .unwrap_or(previous)
}
