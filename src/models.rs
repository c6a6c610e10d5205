//! Domain types shared by the store, the AI client and the runtime

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single conversation between one user and Milo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Maintained by the store; the core never writes it.
    pub updated_at: DateTime<Utc>,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Ai,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Ai => write!(f, "ai"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "ai" => Ok(MessageRole::Ai),
            "system" => Ok(MessageRole::System),
            _ => Err(ParseNameError::new("message role", s)),
        }
    }
}

/// Milo's emotional tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Sad,
    Excited,
    Calm,
    Thoughtful,
    Concerned,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Excited,
        Emotion::Calm,
        Emotion::Thoughtful,
        Emotion::Concerned,
        Emotion::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Excited => "excited",
            Emotion::Calm => "calm",
            Emotion::Thoughtful => "thoughtful",
            Emotion::Concerned => "concerned",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == lowered)
            .ok_or_else(|| ParseNameError::new("emotion", s))
    }
}

/// Milo's animation / interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralState {
    Idle,
    Thinking,
    Speaking,
    Listening,
    Celebrating,
}

impl BehavioralState {
    pub const ALL: [BehavioralState; 5] = [
        BehavioralState::Idle,
        BehavioralState::Thinking,
        BehavioralState::Speaking,
        BehavioralState::Listening,
        BehavioralState::Celebrating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BehavioralState::Idle => "idle",
            BehavioralState::Thinking => "thinking",
            BehavioralState::Speaking => "speaking",
            BehavioralState::Listening => "listening",
            BehavioralState::Celebrating => "celebrating",
        }
    }
}

impl fmt::Display for BehavioralState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehavioralState {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        BehavioralState::ALL
            .into_iter()
            .find(|b| b.as_str() == lowered)
            .ok_or_else(|| ParseNameError::new("behavioral state", s))
    }
}

/// The (emotion, behavioral state) pair that drives Milo's presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoodPair {
    pub emotion: Emotion,
    pub state: BehavioralState,
}

impl MoodPair {
    /// Mood attached to the session greeting
    pub const GREETING: MoodPair = MoodPair::new(Emotion::Happy, BehavioralState::Idle);

    pub const fn new(emotion: Emotion, state: BehavioralState) -> Self {
        Self { emotion, state }
    }

    /// Short text face for terminal rendering
    pub fn face(self) -> &'static str {
        match self.emotion {
            Emotion::Happy => "^_^",
            Emotion::Sad => ";_;",
            Emotion::Excited => "!_!",
            Emotion::Calm => "~_~",
            Emotion::Thoughtful => "?_?",
            Emotion::Concerned => "o_o",
            Emotion::Neutral => "-_-",
        }
    }
}

impl Default for MoodPair {
    fn default() -> Self {
        Self::GREETING
    }
}

impl fmt::Display for MoodPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.emotion, self.state)
    }
}

/// A single chat message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    /// Only present on AI-authored messages
    pub mood: Option<MoodPair>,
}

impl Message {
    pub fn is_ai(&self) -> bool {
        self.role == MessageRole::Ai
    }
}

/// Unrecognised enum name coming from the store or the AI service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value:?}")]
pub struct ParseNameError {
    pub what: &'static str,
    pub value: String,
}

impl ParseNameError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}
