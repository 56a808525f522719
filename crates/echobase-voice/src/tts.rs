//! Speech-synthesis client.

use crate::config::TtsConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use echobase_types::voice::synthesis_model_for;
use serde::Serialize;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// A synthesized reply: the audio bytes together with the text they were
/// rendered from, so callers never have to track which text belongs to
/// which audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedReply {
    pub text: String,
    pub audio: Vec<u8>,
}

/// Renders reply text to audio in the bot's chosen voice.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// `voice_id` is the application-level selector; the mapping to the
    /// provider's model is total, so an unknown selector synthesizes with
    /// the fallback voice instead of failing the turn.
    async fn synthesize(&self, text: &str, voice_id: &str)
        -> Result<SynthesizedReply, VoiceError>;
}

/// HTTP synthesis client for a Deepgram-style speak endpoint.
#[derive(Debug, Clone)]
pub struct DeepgramTts {
    client: reqwest::Client,
    config: TtsConfig,
}

#[derive(Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

impl DeepgramTts {
    pub fn new(config: TtsConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build TTS http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Synthesizer for DeepgramTts {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesizedReply, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::Synthesis("empty reply text".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let model = synthesis_model_for(voice_id);
        let url = format!("{}?model={}", self.config.endpoint, model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.config.api_key))
            .json(&SpeakRequest { text })
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                model,
                "TTS upstream returned non-success"
            );
            return Err(VoiceError::Synthesis(format!("upstream status {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("failed to read audio body: {e}")))?
            .to_vec();

        if audio.is_empty() {
            return Err(VoiceError::Synthesis(
                "upstream returned empty audio".to_string(),
            ));
        }

        Ok(SynthesizedReply {
            text: text.to_string(),
            audio,
        })
    }
}
