//! Shared test harness: a full router over a tempfile-backed database with
//! stub vendor clients, so tests exercise real handlers, middleware, and
//! SQL without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use echobase_db::{create_pool, DbPool, PoolOptions};
use echobase_server::config::RateLimitConfig;
use echobase_server::middleware::RateLimiter;
use echobase_server::{app, AppState, SqliteConversationSink};
use echobase_types::Clip;
use echobase_voice::{
    Responder, SynthesizedReply, Synthesizer, Transcriber, VoiceError, VoiceTurnOrchestrator,
};
use serde_json::Value;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Stub transcription client returning a fixed result.
pub struct StubStt(pub Result<String, ()>);

#[async_trait]
impl Transcriber for StubStt {
    async fn transcribe(&self, _clip: &Clip) -> Result<String, VoiceError> {
        self.0
            .clone()
            .map_err(|_| VoiceError::Transcription("upstream status 500".to_string()))
    }
}

/// Stub generation client with a call counter.
pub struct StubLlm {
    pub calls: Arc<AtomicUsize>,
    result: Result<String, ()>,
}

#[async_trait]
impl Responder for StubLlm {
    async fn respond(&self, _user_text: &str, _system_prompt: &str) -> Result<String, VoiceError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.result
            .clone()
            .map_err(|_| VoiceError::Generation("upstream status 500".to_string()))
    }
}

/// Stub synthesis client with a call counter.
pub struct StubTts {
    pub calls: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Synthesizer for StubTts {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<SynthesizedReply, VoiceError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(VoiceError::Synthesis("upstream status 502".to_string()));
        }
        Ok(SynthesizedReply {
            text: text.to_string(),
            audio: vec![0x1D; 256],
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    pub llm_calls: Arc<AtomicUsize>,
    pub tts_calls: Arc<AtomicUsize>,
    // Keeps the database directory alive for the test's duration.
    _db_dir: TempDir,
}

/// Builds a router over a fresh database with default rate limits.
///
/// `stt` and `llm` are `Ok(text)` or `Err(())` (vendor failure); `tts_ok`
/// selects synthesis success or failure. The users `user-1` and `user-2`
/// are seeded.
pub fn setup(stt: Result<&str, ()>, llm: Result<&str, ()>, tts_ok: bool) -> TestApp {
    setup_with_limits(stt, llm, tts_ok, RateLimitConfig::default())
}

pub fn setup_with_limits(
    stt: Result<&str, ()>,
    llm: Result<&str, ()>,
    tts_ok: bool,
    limits: RateLimitConfig,
) -> TestApp {
    setup_with_transcriber(Arc::new(StubStt(stt.map(str::to_string))), llm, tts_ok, limits)
}

/// Variant taking an arbitrary transcriber, for tests that need to hold a
/// turn open mid-flight.
pub fn setup_with_transcriber(
    stt_client: Arc<dyn Transcriber>,
    llm: Result<&str, ()>,
    tts_ok: bool,
    limits: RateLimitConfig,
) -> TestApp {
    let db_dir = TempDir::new().expect("failed to create temp dir");
    let db_path = db_dir.path().join("echobase.db");
    let pool = create_pool(
        db_path.to_str().expect("non-utf8 temp path"),
        PoolOptions::default(),
    )
    .expect("failed to create pool");

    {
        let conn = pool.get().expect("failed to get connection");
        echobase_db::run_migrations(&conn).expect("failed to run migrations");
        echobase_store::create_user(&conn, "user-1").expect("failed to seed user");
        echobase_store::create_user(&conn, "user-2").expect("failed to seed user");
    }

    let llm_calls = Arc::new(AtomicUsize::new(0));
    let tts_calls = Arc::new(AtomicUsize::new(0));

    let llm_client = Arc::new(StubLlm {
        calls: llm_calls.clone(),
        result: llm.map(str::to_string),
    });
    let tts_client = Arc::new(StubTts {
        calls: tts_calls.clone(),
        fail: !tts_ok,
    });
    let sink = Arc::new(SqliteConversationSink::new(pool.clone()));
    let orchestrator = Arc::new(VoiceTurnOrchestrator::new(
        stt_client.clone(),
        llm_client,
        tts_client,
        sink,
    ));

    let state = AppState {
        pool: pool.clone(),
        rate_limiter: RateLimiter::new(),
        rate_limits: limits,
        orchestrator,
        stt: stt_client,
        active_turns: Arc::new(Mutex::new(HashSet::new())),
    };

    TestApp {
        app: app(state),
        pool,
        llm_calls,
        tts_calls,
        _db_dir: db_dir,
    }
}

/// Request builder with the bearer token and the `ConnectInfo` extension
/// the rate limiter keys on.
pub fn authed_request(method: &str, uri: &str, user_id: &str) -> axum::http::request::Builder {
    let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {user_id}"))
        .extension(ConnectInfo(addr))
}

/// Request builder without credentials, for auth-rejection tests.
pub fn anonymous_request(method: &str, uri: &str) -> axum::http::request::Builder {
    let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(addr))
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not valid json")
}

/// Creates a bot through the API and returns its public id.
pub async fn create_bot(app: &Router, user_id: &str, name: &str, voice_id: &str) -> String {
    use tower::ServiceExt;

    let payload = serde_json::json!({
        "name": name,
        "system_prompt": "You are a geography tutor.",
        "voice_id": voice_id,
    });
    let response = app
        .clone()
        .oneshot(
            authed_request("POST", "/api/bots", user_id)
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["bot_id"].as_str().expect("missing bot_id").to_string()
}
