//! Bot CRUD handlers.

use crate::middleware::UserContext;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use echobase_store::{create_bot, delete_bot, list_bots, Bot, CreateBotParams, StoreError};
use echobase_types::VoiceSelector;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Maximum length for a bot name.
const MAX_NAME_LEN: usize = 256;
/// Maximum length for a system prompt.
const MAX_PROMPT_LEN: usize = 8 * 1024;
/// Maximum length for a voice selector.
const MAX_VOICE_ID_LEN: usize = 64;

/// Maps a [`StoreError`] to the correct HTTP status code, logging non-404
/// errors.
///
/// `NotFound` → 404, everything else → 500 (with error logged).
pub(crate) fn store_err_to_status(e: StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        ref err => {
            tracing::error!(error = %err, "store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Deserialize)]
pub struct CreateBotRequest {
    pub name: String,
    pub system_prompt: String,
    pub voice_id: String,
}

/// POST /api/bots
pub async fn create_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(UserContext(user_id)): Extension<UserContext>,
    Json(payload): Json<CreateBotRequest>,
) -> Result<(StatusCode, Json<Bot>), StatusCode> {
    // Validate string lengths to prevent oversized payloads
    if payload.name.trim().is_empty() || payload.name.len() > MAX_NAME_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if payload.system_prompt.len() > MAX_PROMPT_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if payload.voice_id.is_empty() || payload.voice_id.len() > MAX_VOICE_ID_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    // An unknown selector is accepted and synthesized with the fallback
    // voice, but log it so misbehaving clients are visible.
    if VoiceSelector::parse(&payload.voice_id).is_none() {
        tracing::warn!(voice_id = %payload.voice_id, "unrecognized voice selector");
    }

    let params = CreateBotParams {
        user_id,
        name: payload.name,
        system_prompt: payload.system_prompt,
        voice_id: payload.voice_id,
    };

    let pool = state.pool.clone();
    let bot = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        create_bot(&conn, &params).map_err(store_err_to_status)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    tracing::info!(bot_id = %bot.bot_id, "bot created");
    Ok((StatusCode::CREATED, Json(bot)))
}

/// GET /api/bots
pub async fn list_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(UserContext(user_id)): Extension<UserContext>,
) -> Result<Json<Vec<Bot>>, StatusCode> {
    let pool = state.pool.clone();
    let bots = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        list_bots(&conn, &user_id).map_err(store_err_to_status)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(bots))
}

/// DELETE /api/bots/{botId}
pub async fn delete_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(UserContext(user_id)): Extension<UserContext>,
    Path(bot_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let pool = state.pool.clone();
    let deleted_id = bot_id.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        delete_bot(&conn, &deleted_id, &user_id).map_err(store_err_to_status)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    tracing::info!(bot_id = %bot_id, "bot deleted");
    Ok(Json(json!({ "status": "deleted", "bot_id": bot_id })))
}
