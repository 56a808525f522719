//! EchoBase server library logic.

pub mod api_bots;
pub mod api_conversations;
pub mod api_voice;
pub mod config;
pub mod middleware;
pub mod sink;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use echobase_db::DbPool;
use echobase_voice::{Transcriber, VoiceTurnOrchestrator};
use middleware::RateLimiter;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

pub use sink::SqliteConversationSink;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Rate limiter state.
    pub rate_limiter: RateLimiter,
    /// Per-minute limits applied by the rate-limit middleware.
    pub rate_limits: config::RateLimitConfig,
    /// The voice-turn orchestrator (STT → LLM → TTS → persist).
    pub orchestrator: Arc<VoiceTurnOrchestrator>,
    /// Standalone transcription client for the `/api/stt` route.
    pub stt: Arc<dyn Transcriber>,
    /// Bot ids with a voice turn currently in flight.
    ///
    /// Uses `std::sync::Mutex` intentionally: all lock acquisitions are
    /// brief HashSet operations (insert/remove) that never span `.await`
    /// points, making a synchronous lock safe here.
    pub active_turns: Arc<Mutex<HashSet<String>>>,
}

/// Maximum request body size (1 MiB) for ordinary JSON routes.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Maximum request body size (12 MiB) for audio-upload routes. The voice
/// pipeline rejects clips over 10 MiB; the extra headroom covers framing.
const MAX_AUDIO_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/bots",
            post(api_bots::create_bot_handler).get(api_bots::list_bots_handler),
        )
        .route(
            "/api/bots/{botId}",
            delete(api_bots::delete_bot_handler),
        )
        .route(
            "/api/bots/{botId}/conversation",
            get(api_conversations::get_conversation_handler),
        )
        .route("/api/voices", get(api_voice::list_voices_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    // Audio routes need a larger body limit for uploaded clips.
    let audio_routes = Router::new()
        .route(
            "/api/bots/{botId}/voice-turn",
            post(api_voice::voice_turn_handler),
        )
        .route("/api/stt", post(api_voice::stt_handler))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .merge(audio_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
