use thiserror::Error;

/// Errors raised by the voice pipeline's clients and the recorder.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The speech-to-text service returned a non-success status or an
    /// unusable response.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The language-response service returned a non-success status or no
    /// generated text.
    #[error("generation error: {0}")]
    Generation(String),

    /// The speech-synthesis service returned a non-success status.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// The audio-capture resource could not be acquired or used.
    #[error("capture error: {0}")]
    Capture(String),

    /// Invalid client configuration.
    #[error("invalid voice configuration: {0}")]
    Config(String),
}

/// Error reported when the conversation store rejects the turn-pair write.
///
/// Carried inside a successful turn outcome rather than failing the turn:
/// the synthesized audio already exists and playback must not be
/// conditioned on persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to persist conversation turns: {0}")]
pub struct PersistenceError(pub String);
