//! Connection pool creation and per-connection initialization.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;
use thiserror::Error;

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pool sizing and contention tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// How long a connection waits on a locked database before giving up.
    /// Turn-pair writes are short transactions, so contention clears fast;
    /// this mostly absorbs checkpoint pauses.
    pub busy_timeout: Duration,

    /// Upper bound on pooled connections. The conversation workload is
    /// append-mostly with a single writer at a time per bot, so a small
    /// pool is enough: most connections serve reads.
    pub max_connections: u32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 8,
        }
    }
}

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Creates a new SQLite connection pool.
///
/// Every connection is initialized with:
///
/// - `journal_mode = WAL` — concurrent readers alongside the single
///   writer, which fits the append-mostly conversation log. Verified,
///   since SQLite silently keeps the old mode when it cannot switch.
/// - `synchronous = NORMAL` — the WAL-recommended level; a power loss can
///   drop the last turns but never corrupts the database.
/// - `foreign_keys = ON` — conversation rows hang off bots via
///   `ON DELETE CASCADE`, and SQLite enforces foreign keys per connection,
///   not per database.
/// - the configured busy timeout.
///
/// `db_path` may be `:memory:` for tests; note that with a pool every
/// connection then gets its own private database.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, options: PoolOptions) -> Result<DbPool, PoolError> {
    let busy_timeout = options.busy_timeout;
    let manager =
        SqliteConnectionManager::file(db_path).with_init(move |conn| init_connection(conn, busy_timeout));

    let pool = Pool::builder()
        .max_size(options.max_connections)
        .build(manager)?;

    Ok(pool)
}

fn init_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    // In-memory databases report "memory"; anything else means the switch
    // was refused.
    if mode != "wal" && mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode is {mode}, expected wal")),
        ));
    }

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", busy_timeout.as_millis() as i64)?;
    Ok(())
}
