//! Voice-turn and transcription handlers.

use crate::api_bots::store_err_to_status;
use crate::middleware::UserContext;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use echobase_store::get_bot_for_user;
use echobase_types::{AudioEncoding, Clip, VoiceSelector};
use echobase_voice::{TurnBot, TurnError};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Holds a bot id in the active-turn set for the duration of one voice
/// turn. Removal happens on drop, so the slot is released on every exit
/// path, including handler errors.
struct TurnGuard {
    active: Arc<Mutex<HashSet<String>>>,
    bot_id: String,
}

impl TurnGuard {
    /// Claims the bot's turn slot, or returns `None` if a turn is already
    /// in flight for it.
    fn acquire(active: &Arc<Mutex<HashSet<String>>>, bot_id: &str) -> Option<Self> {
        if !lock_active(active).insert(bot_id.to_string()) {
            return None;
        }
        Some(Self {
            active: active.clone(),
            bot_id: bot_id.to_string(),
        })
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        lock_active(&self.active).remove(&self.bot_id);
    }
}

fn lock_active(active: &Arc<Mutex<HashSet<String>>>) -> std::sync::MutexGuard<'_, HashSet<String>> {
    match active.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            // A panicked holder leaves at worst a stale entry; recover
            // rather than wedging every voice turn on this server.
            tracing::error!("active-turn lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn clip_from_request(headers: &HeaderMap, body: Bytes) -> Result<Clip, Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let encoding = AudioEncoding::from_content_type(content_type).ok_or_else(|| {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({ "error": format!("unsupported audio content type: {content_type}") })),
        )
            .into_response()
    })?;

    Clip::new(body.to_vec(), encoding).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "empty audio body" })),
        )
            .into_response()
    })
}

/// POST /api/bots/{botId}/voice-turn
///
/// Runs one full voice interaction: transcribe the uploaded clip, generate
/// a reply under the bot's system prompt, synthesize it in the bot's
/// voice, and persist the (user, assistant) pair. The response body is the
/// reply audio; the reply text travels in the `X-Reply-Text` header
/// (percent-encoded, since header values cannot carry arbitrary UTF-8) and
/// `X-Turn-Persisted` reports whether the transcript write succeeded.
pub async fn voice_turn_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(UserContext(user_id)): Extension<UserContext>,
    Path(bot_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let clip = match clip_from_request(&headers, body) {
        Ok(clip) => clip,
        Err(response) => return response,
    };

    // Ownership check before claiming the turn slot, so probing another
    // user's bot cannot learn whether it is mid-turn.
    let pool = state.pool.clone();
    let lookup_bot_id = bot_id.clone();
    let lookup_user_id = user_id.clone();
    let bot = match tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        get_bot_for_user(&conn, &lookup_bot_id, &lookup_user_id).map_err(store_err_to_status)
    })
    .await
    {
        Ok(Ok(bot)) => bot,
        Ok(Err(status)) => return status.into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    // One turn per bot at a time. A second request while one is in flight
    // is a conflict, not a queue.
    let _guard = match TurnGuard::acquire(&state.active_turns, &bot.bot_id) {
        Some(guard) => guard,
        None => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "a voice turn is already in progress for this bot" })),
            )
                .into_response();
        }
    };

    let turn_bot = TurnBot {
        bot_id: bot.bot_id,
        system_prompt: bot.system_prompt,
        voice_id: bot.voice_id,
    };

    match state.orchestrator.run_turn(clip, &turn_bot).await {
        Ok(outcome) => {
            let encoded_text =
                utf8_percent_encode(&outcome.response_text, NON_ALPHANUMERIC).to_string();
            let reply_text = match HeaderValue::from_str(&encoded_text) {
                Ok(value) => value,
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            };
            let persisted = if outcome.persistence.is_ok() {
                HeaderValue::from_static("true")
            } else {
                HeaderValue::from_static("false")
            };

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
                    (header::HeaderName::from_static("x-reply-text"), reply_text),
                    (header::HeaderName::from_static("x-turn-persisted"), persisted),
                ],
                outcome.audio,
            )
                .into_response()
        }
        Err(TurnError::NoSpeechDetected) => (
            StatusCode::OK,
            Json(json!({ "outcome": "no_speech_detected" })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(
                bot_id = %turn_bot.bot_id,
                stage = err.stage().as_str(),
                error = %err,
                "voice turn failed"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": err.to_string(),
                    "stage": err.stage().as_str(),
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/stt
///
/// Standalone transcription: accepts an audio clip and returns its text
/// without touching any bot or conversation record.
pub async fn stt_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let clip = match clip_from_request(&headers, body) {
        Ok(clip) => clip,
        Err(response) => return response,
    };

    match state.stt.transcribe(&clip).await {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "standalone transcription failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": err.to_string(),
                    "stage": "transcribing",
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/voices
///
/// Lists the voice selectors a bot can be created with.
pub async fn list_voices_handler() -> Json<serde_json::Value> {
    let voices: Vec<&'static str> = VoiceSelector::ALL.iter().map(|v| v.as_str()).collect();
    Json(json!({ "voices": voices }))
}
