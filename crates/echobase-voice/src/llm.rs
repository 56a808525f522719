//! Language-response client.

use crate::config::LlmConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generates the bot's text reply to a transcribed user utterance.
#[async_trait]
pub trait Responder: Send + Sync {
    /// `user_text` must be non-empty. An empty `system_prompt` means "no
    /// behavioral guidance" and is not an error.
    async fn respond(&self, user_text: &str, system_prompt: &str) -> Result<String, VoiceError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint
/// (Groq-style).
#[derive(Debug, Clone)]
pub struct GroqChat {
    client: reqwest::Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqChat {
    pub fn new(config: LlmConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build LLM http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Responder for GroqChat {
    async fn respond(&self, user_text: &str, system_prompt: &str) -> Result<String, VoiceError> {
        if user_text.trim().is_empty() {
            return Err(VoiceError::Generation("empty user text".to_string()));
        }

        let mut messages = Vec::with_capacity(2);
        if !system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_text,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "LLM upstream returned non-success");
            return Err(VoiceError::Generation(format!("upstream status {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Generation(format!("invalid response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(VoiceError::Generation(
                "upstream returned no generated text".to_string(),
            ));
        }

        Ok(text)
    }
}
