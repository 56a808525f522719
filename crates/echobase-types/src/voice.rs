//! Voice selectors, audio encodings, and the captured clip value.
//!
//! A `VoiceSelector` is the application-level voice a bot creator picks,
//! distinct from the synthesis provider's own model identifier. The mapping
//! between the two is total: every input string maps to a synthesis model,
//! falling back to [`FALLBACK_SYNTHESIS_MODEL`] for unrecognized selectors,
//! so a turn never fails because of a voice the server does not know about.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The synthesis model used when a voice selector is not recognized.
pub const FALLBACK_SYNTHESIS_MODEL: &str = "aura-asteria-en";

/// Application-level voice selectors available to bot creators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSelector {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl VoiceSelector {
    /// All recognized selectors, in display order.
    pub const ALL: [VoiceSelector; 6] = [
        Self::Alloy,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Shimmer,
    ];

    /// Returns the selector's string form as stored on bot records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }

    /// Attempts to parse a stored selector string.
    ///
    /// Returns `None` for unrecognized strings. Callers that need a
    /// synthesis model should use [`synthesis_model_for`] instead, which
    /// never fails.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "alloy" => Some(Self::Alloy),
            "echo" => Some(Self::Echo),
            "fable" => Some(Self::Fable),
            "onyx" => Some(Self::Onyx),
            "nova" => Some(Self::Nova),
            "shimmer" => Some(Self::Shimmer),
            _ => None,
        }
    }

    /// Returns the synthesis provider's model identifier for this selector.
    pub fn synthesis_model(self) -> &'static str {
        match self {
            Self::Alloy => "aura-asteria-en",
            Self::Echo => "aura-luna-en",
            Self::Fable => "aura-stella-en",
            Self::Onyx => "aura-athena-en",
            Self::Nova => "aura-hera-en",
            Self::Shimmer => "aura-orion-en",
        }
    }
}

/// Maps any stored voice selector string to a synthesis model.
///
/// Total over all inputs: unrecognized selectors map to
/// [`FALLBACK_SYNTHESIS_MODEL`] rather than erroring, keeping turns
/// resilient to voice additions the server has not learned about yet.
pub fn synthesis_model_for(voice_id: &str) -> &'static str {
    VoiceSelector::parse(voice_id)
        .map(VoiceSelector::synthesis_model)
        .unwrap_or(FALLBACK_SYNTHESIS_MODEL)
}

/// Content encodings accepted for captured audio clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// WebM container with Opus audio (browser `MediaRecorder` default).
    WebmOpus,
    /// Ogg container with Opus audio.
    OggOpus,
    /// WAV (PCM).
    Wav,
    /// MPEG audio (MP3).
    Mpeg,
}

impl AudioEncoding {
    /// Returns the MIME content type for this encoding.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::WebmOpus => "audio/webm",
            Self::OggOpus => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::Mpeg => "audio/mpeg",
        }
    }

    /// Attempts to match a request content type to an encoding.
    ///
    /// Parameters after `;` (e.g. `audio/webm;codecs=opus`) are ignored.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = value.split(';').next().unwrap_or(value).trim();
        match mime {
            "audio/webm" => Some(Self::WebmOpus),
            "audio/ogg" => Some(Self::OggOpus),
            "audio/wav" | "audio/x-wav" => Some(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mpeg),
            _ => None,
        }
    }
}

/// Error returned when constructing a clip from zero bytes of audio.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("clip contains no audio data")]
pub struct EmptyClipError;

/// One finalized, contiguous unit of captured audio.
///
/// A clip is immutable once constructed and is handed by value from the
/// recorder to the turn orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    data: Vec<u8>,
    encoding: AudioEncoding,
}

impl Clip {
    /// Constructs a clip, rejecting empty audio.
    pub fn new(data: Vec<u8>, encoding: AudioEncoding) -> Result<Self, EmptyClipError> {
        if data.is_empty() {
            return Err(EmptyClipError);
        }
        Ok(Self { data, encoding })
    }

    /// The raw audio bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The declared content encoding.
    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    /// Number of audio bytes in the clip.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: empty clips cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mapping_is_total_and_distinct() {
        let mut models = HashSet::new();
        for selector in VoiceSelector::ALL {
            let model = synthesis_model_for(selector.as_str());
            assert_eq!(model, selector.synthesis_model());
            assert!(models.insert(model), "duplicate synthesis model: {model}");
        }
        assert_eq!(models.len(), 6);
    }

    #[test]
    fn unrecognized_selector_falls_back() {
        assert_eq!(synthesis_model_for("sapphire"), FALLBACK_SYNTHESIS_MODEL);
        assert_eq!(synthesis_model_for(""), FALLBACK_SYNTHESIS_MODEL);
        assert_eq!(synthesis_model_for("ALLOY"), FALLBACK_SYNTHESIS_MODEL);
    }

    #[test]
    fn selector_round_trip() {
        for selector in VoiceSelector::ALL {
            assert_eq!(VoiceSelector::parse(selector.as_str()), Some(selector));
        }
        assert_eq!(VoiceSelector::parse("unknown"), None);
    }

    #[test]
    fn encoding_from_content_type() {
        assert_eq!(
            AudioEncoding::from_content_type("audio/webm"),
            Some(AudioEncoding::WebmOpus)
        );
        assert_eq!(
            AudioEncoding::from_content_type("audio/webm;codecs=opus"),
            Some(AudioEncoding::WebmOpus)
        );
        assert_eq!(
            AudioEncoding::from_content_type("audio/x-wav"),
            Some(AudioEncoding::Wav)
        );
        assert_eq!(AudioEncoding::from_content_type("text/plain"), None);
    }

    #[test]
    fn clip_rejects_empty_audio() {
        assert_eq!(
            Clip::new(Vec::new(), AudioEncoding::WebmOpus),
            Err(EmptyClipError)
        );

        let clip = Clip::new(vec![1, 2, 3], AudioEncoding::Wav).unwrap();
        assert_eq!(clip.len(), 3);
        assert_eq!(clip.encoding(), AudioEncoding::Wav);
    }
}
