//! Voice-turn pipeline for the EchoBase platform.
//!
//! Sequences the three vendor services — speech-to-text, language response,
//! speech synthesis — into one logical turn, persists the resulting
//! (user, assistant) pair through a sink seam, and manages the single
//! active recording session that produces the input clip.
//!
//! The vendor clients are thin HTTP adapters behind traits so the
//! orchestrator can be exercised without network access. Each call is
//! bounded by a configured timeout and never retried; retry policy belongs
//! to callers.

pub mod config;
pub mod error;
pub mod llm;
pub mod recorder;
pub mod stt;
pub mod tts;
pub mod turn;

pub use config::{LlmConfig, SttConfig, TtsConfig, VoiceConfig};
pub use error::{PersistenceError, VoiceError};
pub use llm::{GroqChat, Responder};
pub use recorder::{CaptureDevice, CaptureGuard, Recorder};
pub use stt::{DeepgramStt, Transcriber};
pub use tts::{DeepgramTts, SynthesizedReply, Synthesizer};
pub use turn::{ConversationSink, TurnBot, TurnError, TurnOutcome, TurnStage, VoiceTurnOrchestrator};
