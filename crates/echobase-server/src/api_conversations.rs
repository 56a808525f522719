//! Conversation history handlers.

use crate::api_bots::store_err_to_status;
use crate::middleware::UserContext;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use echobase_store::{get_bot_for_user, list_turns, ConversationTurn};
use std::sync::Arc;

/// GET /api/bots/{botId}/conversation
///
/// Returns the full transcript for a bot, oldest first, so the client can
/// render it top to bottom. Ownership is checked before the history query;
/// another user's bot reads as 404.
pub async fn get_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(UserContext(user_id)): Extension<UserContext>,
    Path(bot_id): Path<String>,
) -> Result<Json<Vec<ConversationTurn>>, StatusCode> {
    let pool = state.pool.clone();
    let turns = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        get_bot_for_user(&conn, &bot_id, &user_id).map_err(store_err_to_status)?;
        list_turns(&conn, &bot_id).map_err(store_err_to_status)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(turns))
}
