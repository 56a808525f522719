//! Bot record CRUD, scoped to the owning user.

use crate::StoreError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A voice-chat bot definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bot {
    /// Internal database ID.
    pub id: i64,
    /// Unique public ID for the bot (UUID).
    pub bot_id: String,
    /// ID of the owning user (auth-provider identifier).
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// System prompt sent with every generation request.
    pub system_prompt: String,
    /// Voice selector chosen by the creator (e.g. "nova").
    pub voice_id: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Parameters for creating a new bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBotParams {
    pub user_id: String,
    pub name: String,
    pub system_prompt: String,
    pub voice_id: String,
}

/// Creates a new bot and returns the stored record.
///
/// The public `bot_id` is generated here (UUID v4); the creation timestamp
/// is assigned by the store.
pub fn create_bot(conn: &Connection, params: &CreateBotParams) -> Result<Bot, StoreError> {
    let bot_id = uuid::Uuid::new_v4().to_string();

    let bot = conn.query_row(
        "INSERT INTO bots (bot_id, user_id, name, system_prompt, voice_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, bot_id, user_id, name, system_prompt, voice_id, created_at",
        params![
            bot_id,
            params.user_id,
            params.name,
            params.system_prompt,
            params.voice_id,
        ],
        map_row_to_bot,
    )?;

    Ok(bot)
}

/// Retrieves a bot by public ID, scoped to the owning user.
///
/// Another user's bot is reported as `NotFound` rather than forbidden, so
/// the API does not leak which bot ids exist.
pub fn get_bot_for_user(
    conn: &Connection,
    bot_id: &str,
    user_id: &str,
) -> Result<Bot, StoreError> {
    conn.query_row(
        "SELECT id, bot_id, user_id, name, system_prompt, voice_id, created_at
         FROM bots WHERE bot_id = ?1 AND user_id = ?2",
        [bot_id, user_id],
        map_row_to_bot,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(bot_id.to_string()))
}

/// Lists all bots owned by a user, newest first.
pub fn list_bots(conn: &Connection, user_id: &str) -> Result<Vec<Bot>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, bot_id, user_id, name, system_prompt, voice_id, created_at
         FROM bots WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map([user_id], map_row_to_bot)?;
    let mut bots = Vec::new();
    for row in rows {
        bots.push(row?);
    }
    Ok(bots)
}

/// Deletes a bot by public ID, scoped to the owning user.
///
/// Conversation turns referencing the bot are removed by the
/// `ON DELETE CASCADE` foreign key.
pub fn delete_bot(conn: &Connection, bot_id: &str, user_id: &str) -> Result<(), StoreError> {
    let count = conn.execute(
        "DELETE FROM bots WHERE bot_id = ?1 AND user_id = ?2",
        [bot_id, user_id],
    )?;
    if count == 0 {
        return Err(StoreError::NotFound(bot_id.to_string()));
    }
    Ok(())
}

fn map_row_to_bot(row: &Row) -> rusqlite::Result<Bot> {
    Ok(Bot {
        id: row.get(0)?,
        bot_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        system_prompt: row.get(4)?,
        voice_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}
