//! `OpenAI`-compatible chat completions client for Milo's replies

use super::types::{parse_reply, AiReply};
use super::AiError;
use crate::models::{Message, MessageRole};
use crate::persona::system_prompt;
use crate::runtime::AiClient;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for an `OpenAI`-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    /// Base URL up to and including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Chat completions client producing [`AiReply`] values
pub struct OpenAiCompanionClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiCompanionClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AiError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: settings.api_key,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            model: settings.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn translate_request(&self, history: &[Message], user_message: &str) -> ChatRequest {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: system_prompt(),
        }];

        messages.extend(history.iter().filter_map(translate_message));

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            response_format: Some(ResponseFormat {
                r#type: "json_object".to_string(),
            }),
            stream: false,
        }
    }

    fn normalize_response(resp: ChatResponse) -> Result<AiReply, AiError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::malformed("No choices in response"))?;

        let text = choice
            .message
            .content
            .ok_or_else(|| AiError::malformed("Empty message in response"))?;

        parse_reply(&text)
    }
}

/// System messages are local notices and are not part of the model's context
fn translate_message(msg: &Message) -> Option<ChatMessage> {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Ai => "assistant",
        MessageRole::System => return None,
    };
    Some(ChatMessage {
        role: role.to_string(),
        content: msg.content.clone(),
    })
}

#[async_trait]
impl AiClient for OpenAiCompanionClient {
    async fn generate_response(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AiReply, AiError> {
        let request = self.translate_request(history, user_message);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(AiError::from_status(status.as_u16(), &message));
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::malformed(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(chat_response)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
