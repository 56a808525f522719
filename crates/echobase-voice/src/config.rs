//! Vendor client configuration.
//!
//! Each client gets its own section with endpoint, model, and timeout
//! defaults matching the upstream services EchoBase ships against. API
//! keys are redacted from `Debug` output so config never leaks secrets
//! into logs.

use serde::Deserialize;
use std::fmt;

fn default_stt_endpoint() -> String {
    "https://api.deepgram.com/v1/listen".to_string()
}

fn default_stt_model() -> String {
    "nova-2".to_string()
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_tts_endpoint() -> String {
    "https://api.deepgram.com/v1/speak".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Speech-to-text client settings.
#[derive(Clone, Deserialize)]
pub struct SttConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_stt_model")]
    pub model: String,
    /// Per-request timeout in seconds. A timed-out call fails the stage.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_stt_endpoint(),
            model: default_stt_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for SttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SttConfig")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Language-response client settings.
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Speech-synthesis client settings.
#[derive(Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_tts_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Combined configuration for the three vendor clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}
