//! The recording controller.
//!
//! Owns at most one active recording session at a time. A session acquires
//! the audio-capture device through [`CaptureDevice`], accumulates captured
//! fragments into a bounded buffer, and finalizes them into one immutable
//! [`Clip`] handed to the turn orchestrator by value. The device guard is
//! dropped — releasing the microphone — on every exit path: finish, abort,
//! and failure.

use crate::error::VoiceError;
use echobase_types::{AudioEncoding, Clip};
use std::sync::{Arc, Mutex};

/// Maximum accumulated clip size (10 MiB), matching the STT input limit.
const MAX_CLIP_BYTES: usize = 10 * 1024 * 1024;

/// Exclusive access to the underlying audio-capture resource.
///
/// `open` acquires the device for one session and may fail if the device
/// is unavailable or permission is denied. Releasing happens when the
/// returned guard is dropped.
pub trait CaptureDevice: Send + Sync {
    fn open(&self) -> Result<Box<dyn CaptureGuard>, VoiceError>;
}

/// Marker for a held capture device. Dropping the guard releases it.
pub trait CaptureGuard: Send {}

struct ActiveSession {
    _guard: Box<dyn CaptureGuard>,
    buffer: Vec<u8>,
    encoding: AudioEncoding,
}

/// Single-session audio recorder.
///
/// The lock is only held for brief buffer operations that never span an
/// `.await` point, so a synchronous mutex is safe here.
pub struct Recorder {
    device: Arc<dyn CaptureDevice>,
    active: Mutex<Option<ActiveSession>>,
}

impl Recorder {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            active: Mutex::new(None),
        }
    }

    /// Starts a recording session, acquiring the capture device.
    ///
    /// Rejects overlapping sessions: the microphone is a single-writer
    /// resource, and a second start while one is active is an error, not
    /// a queue.
    pub fn start(&self, encoding: AudioEncoding) -> Result<(), VoiceError> {
        let mut active = self.lock_sessions();
        if active.is_some() {
            return Err(VoiceError::Capture(
                "a recording session is already active".to_string(),
            ));
        }

        let guard = self.device.open()?;
        *active = Some(ActiveSession {
            _guard: guard,
            buffer: Vec::new(),
            encoding,
        });
        Ok(())
    }

    /// Appends one captured audio fragment to the active session.
    pub fn push(&self, fragment: &[u8]) -> Result<(), VoiceError> {
        let mut active = self.lock_sessions();
        let session = active
            .as_mut()
            .ok_or_else(|| VoiceError::Capture("no active recording session".to_string()))?;

        if session.buffer.len() + fragment.len() > MAX_CLIP_BYTES {
            // Drop the session entirely; a clip past the limit cannot be
            // transcribed anyway, and holding the device helps no one.
            *active = None;
            return Err(VoiceError::Capture(format!(
                "recording exceeds maximum size ({MAX_CLIP_BYTES} bytes)"
            )));
        }

        session.buffer.extend_from_slice(fragment);
        Ok(())
    }

    /// Finalizes the active session into one clip, releasing the device.
    pub fn finish(&self) -> Result<Clip, VoiceError> {
        let session = self
            .lock_sessions()
            .take()
            .ok_or_else(|| VoiceError::Capture("no active recording session".to_string()))?;

        // Device guard drops here regardless of the clip outcome.
        Clip::new(session.buffer, session.encoding)
            .map_err(|e| VoiceError::Capture(e.to_string()))
    }

    /// Discards the active session, if any, releasing the device.
    pub fn abort(&self) {
        self.lock_sessions().take();
    }

    /// Whether a session is currently active.
    pub fn is_recording(&self) -> bool {
        self.lock_sessions().is_some()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A panicked holder leaves at worst a stale session; recover
                // rather than wedging the recorder forever.
                tracing::error!("recorder lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
