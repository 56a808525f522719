//! Append-only conversation turn records.

use crate::StoreError;
use echobase_types::Role;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// One persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Internal database ID.
    pub id: i64,
    /// Unique public ID for the turn (UUID).
    pub turn_id: String,
    /// Public ID of the owning bot.
    pub bot_id: String,
    /// Who spoke: `user` or `assistant`.
    pub role: Role,
    /// Turn text content.
    pub content: String,
    /// Creation timestamp (ISO 8601), assigned by the store.
    pub created_at: String,
}

/// Appends one (user, assistant) turn pair as a single transaction.
///
/// A voice interaction persists exactly two rows: the transcript as a
/// `user` turn, then the generated reply as an `assistant` turn. The
/// transaction guarantees a user turn is never visible without its paired
/// assistant turn — a failure at any point leaves zero new rows.
pub fn append_turn_pair(
    conn: &Connection,
    bot_id: &str,
    user_text: &str,
    assistant_text: &str,
) -> Result<(ConversationTurn, ConversationTurn), StoreError> {
    let tx = conn.unchecked_transaction()?;

    let user_turn = insert_turn(&tx, bot_id, Role::User, user_text)?;
    let assistant_turn = insert_turn(&tx, bot_id, Role::Assistant, assistant_text)?;

    tx.commit()?;
    Ok((user_turn, assistant_turn))
}

fn insert_turn(
    conn: &Connection,
    bot_id: &str,
    role: Role,
    content: &str,
) -> Result<ConversationTurn, StoreError> {
    let turn_id = uuid::Uuid::new_v4().to_string();

    let turn = conn.query_row(
        "INSERT INTO conversations (turn_id, bot_id, role, content)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, turn_id, bot_id, role, content, created_at",
        params![turn_id, bot_id, role.as_str(), content],
        map_row_to_turn,
    )?;

    Ok(turn)
}

/// Lists all turns for a bot, oldest first.
///
/// Returns `NotFound` if the bot does not exist, distinguishing "no bot"
/// from "bot with an empty transcript".
pub fn list_turns(conn: &Connection, bot_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
    let bot_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bots WHERE bot_id = ?1)",
        [bot_id],
        |row| row.get(0),
    )?;
    if !bot_exists {
        return Err(StoreError::NotFound(bot_id.to_string()));
    }

    let mut stmt = conn.prepare(
        "SELECT id, turn_id, bot_id, role, content, created_at
         FROM conversations WHERE bot_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt.query_map([bot_id], map_row_to_turn)?;
    let mut turns = Vec::new();
    for row in rows {
        turns.push(row?);
    }
    Ok(turns)
}

fn map_row_to_turn(row: &Row) -> rusqlite::Result<ConversationTurn> {
    let role_str: String = row.get(3)?;
    let role = Role::from_str_opt(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_str}").into(),
        )
    })?;

    Ok(ConversationTurn {
        id: row.get(0)?,
        turn_id: row.get(1)?,
        bot_id: row.get(2)?,
        role,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
