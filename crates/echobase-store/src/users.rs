//! Auth-provider user mirror.
//!
//! EchoBase delegates signup and login to an external auth provider. The
//! `users` table only records which user ids exist so that bearer tokens
//! can be resolved and bot ownership enforced.

use crate::StoreError;
use rusqlite::Connection;

/// Records a user id synced from the auth provider. Idempotent.
pub fn create_user(conn: &Connection, user_id: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
        [user_id],
    )?;
    Ok(())
}

/// Checks whether a user id is known to this server.
pub fn user_exists(conn: &Connection, user_id: &str) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
