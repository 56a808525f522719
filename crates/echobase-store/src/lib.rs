//! Bot and conversation persistence for the EchoBase platform.
//!
//! Implements the Bot Store (create/list/delete, scoped to the owning user)
//! and the Conversation Store (append-only turn records, ordered by
//! creation time). All functions take a plain `rusqlite::Connection`;
//! callers run them inside `spawn_blocking` when on an async runtime.
//!
//! Bots are immutable once created — there is deliberately no update
//! operation. A voice interaction appends its (user, assistant) turn pair
//! inside a single transaction so a user turn is never visible without its
//! paired assistant turn.

mod bots;
mod conversations;
mod users;

use thiserror::Error;

pub use bots::{create_bot, delete_bot, get_bot_for_user, list_bots, Bot, CreateBotParams};
pub use conversations::{append_turn_pair, list_turns, ConversationTurn};
pub use users::{create_user, user_exists};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
}
