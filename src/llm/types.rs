//! Reply types for AI generation

use super::AiError;
use crate::models::{BehavioralState, Emotion, MoodPair};
use serde::Deserialize;

/// Generated reply: text plus the mood Milo should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiReply {
    pub content: String,
    pub mood: MoodPair,
}

impl AiReply {
    pub fn new(content: impl Into<String>, emotion: Emotion, state: BehavioralState) -> Self {
        Self {
            content: content.into(),
            mood: MoodPair::new(emotion, state),
        }
    }
}

/// JSON object the persona prompt asks the model to produce
#[derive(Debug, Deserialize)]
struct ReplyPayload {
    content: String,
    emotion: String,
    #[serde(alias = "behavioral_state", alias = "behavioralState")]
    state: String,
}

/// Parse the model's raw text into an [`AiReply`].
///
/// Accepts a bare JSON object or one wrapped in prose or a fenced code block;
/// the outermost `{ ... }` span is decoded.
pub fn parse_reply(raw: &str) -> Result<AiReply, AiError> {
    let json = extract_object(raw)
        .ok_or_else(|| AiError::malformed(format!("No JSON object in reply: {raw}")))?;

    let payload: ReplyPayload = serde_json::from_str(json)
        .map_err(|e| AiError::malformed(format!("Invalid reply JSON: {e}")))?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AiError::malformed("Reply content is empty"));
    }

    let emotion: Emotion = payload
        .emotion
        .parse()
        .map_err(|e| AiError::malformed(format!("{e}")))?;
    let state: BehavioralState = payload
        .state
        .parse()
        .map_err(|e| AiError::malformed(format!("{e}")))?;

    Ok(AiReply::new(content, emotion, state))
}

fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}
