//! Shared types and constants for the EchoBase platform.
//!
//! This crate provides the foundational types used across all EchoBase
//! crates: conversation roles, voice selectors and their synthesis-model
//! mapping, and the audio clip value handed from capture to transcription.
//!
//! No crate in the workspace depends on anything *except* `echobase-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

pub mod voice;

use serde::{Deserialize, Serialize};

pub use voice::{AudioEncoding, Clip, EmptyClipError, VoiceSelector};

/// The speaker of a conversation turn.
///
/// A single voice interaction always produces a `User` turn (the transcript)
/// followed by an `Assistant` turn (the generated reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human speaking to the bot.
    User,
    /// The bot's generated reply.
    Assistant,
}

impl Role {
    /// Returns the string label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Attempts to convert a database label to a `Role`.
    ///
    /// Returns `None` for unrecognized labels.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_round_trip() {
        assert_eq!(Role::from_str_opt(Role::User.as_str()), Some(Role::User));
        assert_eq!(
            Role::from_str_opt(Role::Assistant.as_str()),
            Some(Role::Assistant)
        );
        assert_eq!(Role::from_str_opt("system"), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        // The wire format matches the database CHECK constraint.
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
