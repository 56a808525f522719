//! Speech-to-text client.

use crate::config::SttConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use echobase_types::Clip;
use serde::Deserialize;
use std::time::Duration;

/// Maximum audio input size for STT (10 MiB). Prevents OOM from oversized
/// payloads.
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Produces the best single transcript for a finalized audio clip.
///
/// One upstream call per invocation, no retry. An empty transcript is a
/// valid result — deciding what "no speech" means belongs to the caller.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &Clip) -> Result<String, VoiceError>;
}

/// HTTP transcription client for a Deepgram-style listen endpoint.
#[derive(Debug, Clone)]
pub struct DeepgramStt {
    client: reqwest::Client,
    config: SttConfig,
}

#[derive(Deserialize)]
struct ListenResponse {
    #[serde(default)]
    results: Option<ListenResults>,
}

#[derive(Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

impl DeepgramStt {
    pub fn new(config: SttConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build STT http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Transcriber for DeepgramStt {
    async fn transcribe(&self, clip: &Clip) -> Result<String, VoiceError> {
        if clip.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Transcription(format!(
                "audio clip exceeds maximum size: {} bytes (limit: {} bytes)",
                clip.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let url = format!(
            "{}?model={}&smart_format=true",
            self.config.endpoint, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", clip.encoding().content_type())
            .body(clip.data().to_vec())
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // Log the status only; the body may echo audio metadata.
            tracing::warn!(status = status.as_u16(), "STT upstream returned non-success");
            return Err(VoiceError::Transcription(format!(
                "upstream status {status}"
            )));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(format!("invalid response body: {e}")))?;

        // An absent transcript is a valid, non-exceptional response shape.
        let transcript = parsed
            .results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default();

        Ok(transcript)
    }
}
