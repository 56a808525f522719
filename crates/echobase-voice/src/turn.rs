//! The voice-turn orchestrator.
//!
//! Sequences one finalized clip through transcription, generation,
//! synthesis, and persistence as an explicit stage machine, giving callers
//! one well-defined failure point per turn instead of an undifferentiated
//! chain of awaits.
//!
//! Two outcomes deserve calling out:
//!
//! - An empty or whitespace-only transcript is a controlled abort
//!   ([`TurnError::NoSpeechDetected`]), not an upstream failure. It writes
//!   nothing and skips the remaining stages, and callers surface it as
//!   "no speech detected, try again" rather than a generic error.
//! - A persistence failure does not unwind the turn. The audio has already
//!   been produced; the outcome carries the write error alongside the
//!   audio so playback is never conditioned on the store.

use crate::error::{PersistenceError, VoiceError};
use crate::llm::Responder;
use crate::stt::Transcriber;
use crate::tts::Synthesizer;
use async_trait::async_trait;
use echobase_types::Clip;
use std::sync::Arc;
use thiserror::Error;

/// Stages of one voice turn, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    Transcribing,
    Generating,
    Synthesizing,
    Persisting,
    Complete,
    Failed,
}

impl TurnStage {
    /// Stage label used in logs and error payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Transcribing => "transcribing",
            Self::Generating => "generating",
            Self::Synthesizing => "synthesizing",
            Self::Persisting => "persisting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Destination for the (user, assistant) turn pair produced by a
/// successful round trip.
///
/// Implementations must append both rows as a single logical write: a
/// partial write (user row without its assistant row) is a persistence
/// failure, never a silent success.
#[async_trait]
pub trait ConversationSink: Send + Sync {
    async fn append_pair(
        &self,
        bot_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), PersistenceError>;
}

/// The bot fields a turn needs: identity for persistence, prompt for
/// generation, voice for synthesis.
#[derive(Debug, Clone)]
pub struct TurnBot {
    pub bot_id: String,
    pub system_prompt: String,
    pub voice_id: String,
}

/// Result of a completed turn.
///
/// `audio` and `response_text` are always present; `persistence` reports
/// the store write independently so the caller can play audio even when
/// the write failed.
#[derive(Debug)]
pub struct TurnOutcome {
    pub transcript: String,
    pub response_text: String,
    pub audio: Vec<u8>,
    pub persistence: Result<(), PersistenceError>,
}

/// Failure of a turn before any audio was produced.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The clip transcribed to nothing. A business outcome, not an error:
    /// zero rows are written and the user should be prompted to re-record.
    #[error("no speech detected")]
    NoSpeechDetected,

    #[error("transcription stage failed: {0}")]
    Transcription(#[source] VoiceError),

    #[error("generation stage failed: {0}")]
    Generation(#[source] VoiceError),

    #[error("synthesis stage failed: {0}")]
    Synthesis(#[source] VoiceError),
}

impl TurnError {
    /// The stage at which the turn failed.
    pub fn stage(&self) -> TurnStage {
        match self {
            Self::NoSpeechDetected | Self::Transcription(_) => TurnStage::Transcribing,
            Self::Generation(_) => TurnStage::Generating,
            Self::Synthesis(_) => TurnStage::Synthesizing,
        }
    }
}

/// Sequences the vendor clients and the conversation sink into one turn.
pub struct VoiceTurnOrchestrator {
    stt: Arc<dyn Transcriber>,
    llm: Arc<dyn Responder>,
    tts: Arc<dyn Synthesizer>,
    sink: Arc<dyn ConversationSink>,
}

impl VoiceTurnOrchestrator {
    pub fn new(
        stt: Arc<dyn Transcriber>,
        llm: Arc<dyn Responder>,
        tts: Arc<dyn Synthesizer>,
        sink: Arc<dyn ConversationSink>,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            sink,
        }
    }

    /// Runs one voice turn for a bot.
    ///
    /// The three vendor calls are sequential: each depends on the previous
    /// stage's output. No call is retried; each is bounded by the client's
    /// configured timeout. If the caller drops this future mid-turn, the
    /// in-flight call is abandoned and no rows are written — persistence
    /// runs strictly last.
    pub async fn run_turn(&self, clip: Clip, bot: &TurnBot) -> Result<TurnOutcome, TurnError> {
        tracing::debug!(
            stage = TurnStage::Transcribing.as_str(),
            bot_id = %bot.bot_id,
            clip_bytes = clip.len(),
            "starting voice turn"
        );
        let transcript = self
            .stt
            .transcribe(&clip)
            .await
            .map_err(TurnError::Transcription)?;

        if transcript.trim().is_empty() {
            tracing::info!(bot_id = %bot.bot_id, "transcript empty, aborting turn");
            return Err(TurnError::NoSpeechDetected);
        }

        tracing::debug!(
            stage = TurnStage::Generating.as_str(),
            bot_id = %bot.bot_id,
            transcript_chars = transcript.len(),
            "transcript received"
        );
        let response_text = self
            .llm
            .respond(&transcript, &bot.system_prompt)
            .await
            .map_err(TurnError::Generation)?;

        tracing::debug!(
            stage = TurnStage::Synthesizing.as_str(),
            bot_id = %bot.bot_id,
            reply_chars = response_text.len(),
            "reply generated"
        );
        let reply = self
            .tts
            .synthesize(&response_text, &bot.voice_id)
            .await
            .map_err(TurnError::Synthesis)?;

        tracing::debug!(
            stage = TurnStage::Persisting.as_str(),
            bot_id = %bot.bot_id,
            audio_bytes = reply.audio.len(),
            "reply synthesized"
        );
        let persistence = self
            .sink
            .append_pair(&bot.bot_id, &transcript, &response_text)
            .await;

        match &persistence {
            Ok(()) => tracing::debug!(
                stage = TurnStage::Complete.as_str(),
                bot_id = %bot.bot_id,
                "voice turn complete"
            ),
            // The audio is still returned; only the transcript record is lost.
            Err(e) => tracing::error!(
                stage = TurnStage::Persisting.as_str(),
                bot_id = %bot.bot_id,
                error = %e,
                "turn pair write failed"
            ),
        }

        Ok(TurnOutcome {
            transcript,
            response_text,
            audio: reply.audio,
            persistence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::SynthesizedReply;
    use echobase_types::AudioEncoding;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn clip() -> Clip {
        Clip::new(vec![0u8; 64], AudioEncoding::WebmOpus).unwrap()
    }

    fn bot() -> TurnBot {
        TurnBot {
            bot_id: "bot-1".to_string(),
            system_prompt: "You are a geography tutor.".to_string(),
            voice_id: "nova".to_string(),
        }
    }

    struct FixedStt(Result<String, ()>);

    #[async_trait]
    impl Transcriber for FixedStt {
        async fn transcribe(&self, _clip: &Clip) -> Result<String, VoiceError> {
            self.0
                .clone()
                .map_err(|_| VoiceError::Transcription("upstream status 500".to_string()))
        }
    }

    struct CountingLlm {
        calls: AtomicUsize,
        result: Result<String, ()>,
    }

    impl CountingLlm {
        fn ok(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Err(()),
            }
        }
    }

    #[async_trait]
    impl Responder for CountingLlm {
        async fn respond(
            &self,
            _user_text: &str,
            _system_prompt: &str,
        ) -> Result<String, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|_| VoiceError::Generation("upstream status 500".to_string()))
        }
    }

    struct CountingTts {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingTts {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Synthesizer for CountingTts {
        async fn synthesize(
            &self,
            text: &str,
            _voice_id: &str,
        ) -> Result<SynthesizedReply, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(VoiceError::Synthesis("upstream status 502".to_string()));
            }
            Ok(SynthesizedReply {
                text: text.to_string(),
                audio: vec![0xAA; 128],
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        pairs: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn failing() -> Self {
            Self {
                pairs: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn pair_count(&self) -> usize {
            self.pairs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ConversationSink for RecordingSink {
        async fn append_pair(
            &self,
            bot_id: &str,
            user_text: &str,
            assistant_text: &str,
        ) -> Result<(), PersistenceError> {
            if self.fail {
                return Err(PersistenceError("disk full".to_string()));
            }
            self.pairs.lock().unwrap().push((
                bot_id.to_string(),
                user_text.to_string(),
                assistant_text.to_string(),
            ));
            Ok(())
        }
    }

    fn orchestrator(
        stt: FixedStt,
        llm: Arc<CountingLlm>,
        tts: Arc<CountingTts>,
        sink: Arc<RecordingSink>,
    ) -> VoiceTurnOrchestrator {
        VoiceTurnOrchestrator::new(Arc::new(stt), llm, tts, sink)
    }

    #[tokio::test]
    async fn successful_turn_persists_one_pair() {
        let llm = Arc::new(CountingLlm::ok("The capital of France is Paris."));
        let tts = Arc::new(CountingTts::ok());
        let sink = Arc::new(RecordingSink::default());
        let orch = orchestrator(
            FixedStt(Ok("What is the capital of France?".to_string())),
            llm.clone(),
            tts.clone(),
            sink.clone(),
        );

        let outcome = orch.run_turn(clip(), &bot()).await.expect("turn failed");

        assert_eq!(outcome.transcript, "What is the capital of France?");
        assert_eq!(outcome.response_text, "The capital of France is Paris.");
        assert!(!outcome.audio.is_empty());
        assert!(outcome.persistence.is_ok());

        let pairs = sink.pairs.lock().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "bot-1");
        assert_eq!(pairs[0].1, "What is the capital of France?");
        assert_eq!(pairs[0].2, "The capital of France is Paris.");
    }

    #[tokio::test]
    async fn empty_transcript_is_no_speech_with_zero_writes() {
        let llm = Arc::new(CountingLlm::ok("unused"));
        let tts = Arc::new(CountingTts::ok());
        let sink = Arc::new(RecordingSink::default());
        let orch = orchestrator(FixedStt(Ok("   ".to_string())), llm.clone(), tts.clone(), sink.clone());

        let err = orch.run_turn(clip(), &bot()).await.unwrap_err();

        assert!(matches!(err, TurnError::NoSpeechDetected));
        assert_eq!(err.stage(), TurnStage::Transcribing);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0, "no generation attempted");
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0, "no synthesis attempted");
        assert_eq!(sink.pair_count(), 0);
    }

    #[tokio::test]
    async fn transcription_failure_is_distinct_from_no_speech() {
        let llm = Arc::new(CountingLlm::ok("unused"));
        let tts = Arc::new(CountingTts::ok());
        let sink = Arc::new(RecordingSink::default());
        let orch = orchestrator(FixedStt(Err(())), llm, tts, sink.clone());

        let err = orch.run_turn(clip(), &bot()).await.unwrap_err();
        assert!(matches!(err, TurnError::Transcription(_)));
        assert_eq!(sink.pair_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_skips_synthesis_and_writes_nothing() {
        let llm = Arc::new(CountingLlm::failing());
        let tts = Arc::new(CountingTts::ok());
        let sink = Arc::new(RecordingSink::default());
        let orch = orchestrator(
            FixedStt(Ok("hello there".to_string())),
            llm.clone(),
            tts.clone(),
            sink.clone(),
        );

        let err = orch.run_turn(clip(), &bot()).await.unwrap_err();

        assert!(matches!(err, TurnError::Generation(_)));
        assert_eq!(err.stage(), TurnStage::Generating);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0, "no synthesis attempted");
        assert_eq!(sink.pair_count(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_after_generation_writes_nothing() {
        let llm = Arc::new(CountingLlm::ok("a fine reply"));
        let tts = Arc::new(CountingTts::failing());
        let sink = Arc::new(RecordingSink::default());
        let orch = orchestrator(
            FixedStt(Ok("hello there".to_string())),
            llm.clone(),
            tts.clone(),
            sink.clone(),
        );

        let err = orch.run_turn(clip(), &bot()).await.unwrap_err();

        assert!(matches!(err, TurnError::Synthesis(_)));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.pair_count(), 0, "no partial user-only row");
    }

    #[tokio::test]
    async fn persistence_failure_still_returns_audio() {
        let llm = Arc::new(CountingLlm::ok("a fine reply"));
        let tts = Arc::new(CountingTts::ok());
        let sink = Arc::new(RecordingSink::failing());
        let orch = orchestrator(
            FixedStt(Ok("hello there".to_string())),
            llm,
            tts,
            sink.clone(),
        );

        let outcome = orch.run_turn(clip(), &bot()).await.expect("turn failed");

        assert!(!outcome.audio.is_empty(), "audio survives the failed write");
        assert_eq!(outcome.response_text, "a fine reply");
        assert_eq!(
            outcome.persistence,
            Err(PersistenceError("disk full".to_string()))
        );
    }
}
