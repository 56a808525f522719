//! EchoBase server binary.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, the vendor voice clients, and graceful shutdown on
//! SIGTERM/SIGINT.

use echobase_server::middleware::RateLimiter;
use echobase_server::{app, config, AppState, SqliteConversationSink};
use echobase_voice::{DeepgramStt, DeepgramTts, GroqChat, VoiceTurnOrchestrator};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("ECHOBASE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = echobase_db::create_pool(
        &config.database.path,
        echobase_db::PoolOptions {
            busy_timeout: std::time::Duration::from_millis(config.database.busy_timeout_ms),
            max_connections: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            echobase_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Build vendor clients and the turn orchestrator
    let stt = Arc::new(
        DeepgramStt::new(config.voice.stt.clone())
            .expect("failed to build transcription client — check voice.stt in config"),
    );
    let llm = Arc::new(
        GroqChat::new(config.voice.llm.clone())
            .expect("failed to build generation client — check voice.llm in config"),
    );
    let tts = Arc::new(
        DeepgramTts::new(config.voice.tts.clone())
            .expect("failed to build synthesis client — check voice.tts in config"),
    );
    let sink = Arc::new(SqliteConversationSink::new(pool.clone()));
    let orchestrator = Arc::new(VoiceTurnOrchestrator::new(
        stt.clone(),
        llm,
        tts,
        sink,
    ));

    // Build application
    let state = AppState {
        pool,
        rate_limiter: RateLimiter::new(),
        rate_limits: config.rate_limit.clone(),
        orchestrator,
        stt,
        active_turns: Arc::new(Mutex::new(HashSet::new())),
    };
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting echobase server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown. ConnectInfo supplies the client IP the
    // rate limiter keys on.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("echobase server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
