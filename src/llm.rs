//! AI reply generation
//!
//! Provides the HTTP-backed [`AiClient`] used in production and a logging
//! wrapper around any client.

mod error;
mod openai;
mod types;

pub use error::{AiError, AiErrorKind};
pub use openai::{OpenAiCompanionClient, OpenAiSettings};
pub use types::{parse_reply, AiReply};

use crate::models::Message;
use crate::runtime::AiClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Logging wrapper for AI clients
pub struct LoggingAiClient {
    inner: Arc<dyn AiClient>,
    label: String,
}

impl LoggingAiClient {
    pub fn new(inner: Arc<dyn AiClient>, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }
}

#[async_trait]
impl AiClient for LoggingAiClient {
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_response(history, user_message).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.label,
                    duration_ms = %duration.as_millis(),
                    history_len = history.len(),
                    mood = %reply.mood,
                    "AI reply generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.label,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "AI reply failed"
                );
            }
        }

        result
    }
}
