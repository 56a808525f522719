//! Embedded SQL migration runner.
//!
//! Migrations are SQL files embedded at compile time and applied in list
//! order. Progress is tracked in SQLite's `user_version` header field: a
//! database at version N has had the first N migrations applied. Each
//! migration's schema changes and the version bump commit in one
//! transaction, so a failure leaves both untouched.

use rusqlite::Connection;
use thiserror::Error;

/// All migrations in order. Appending is the only allowed change; the
/// position in this list is the schema version the migration produces.
const MIGRATIONS: &[(&str, &str)] = &[
    ("users", include_str!("migrations/000_users.sql")),
    ("bots", include_str!("migrations/001_bots.sql")),
    ("conversations", include_str!("migrations/002_conversations.sql")),
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    Apply {
        /// The name of the migration that failed.
        name: &'static str,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to read or update the schema version.
    #[error("failed to access schema version: {0}")]
    Version(#[from] rusqlite::Error),

    /// The database reports a schema version newer than this build knows.
    #[error("database schema version {found} is ahead of this build (knows {known})")]
    VersionAhead { found: i64, known: usize },
}

/// Runs all pending migrations against the given connection.
///
/// Returns the number of migrations applied. A database whose version is
/// ahead of this build's migration list is refused outright — running an
/// old server against a newer schema is a deployment mistake, not
/// something to limp through.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, MIGRATIONS)
}

fn schema_version(conn: &Connection) -> Result<i64, MigrationError> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

fn apply_pending(
    conn: &Connection,
    migrations: &[(&'static str, &str)],
) -> Result<usize, MigrationError> {
    let version = schema_version(conn)?;
    if version < 0 || version as usize > migrations.len() {
        return Err(MigrationError::VersionAhead {
            found: version,
            known: migrations.len(),
        });
    }

    let pending = &migrations[version as usize..];
    for (offset, &(name, sql)) in pending.iter().enumerate() {
        let target_version = version + offset as i64 + 1;
        tracing::info!(migration = name, version = target_version, "applying migration");

        let wrap = |source| MigrationError::Apply { name, source };
        let tx = conn.unchecked_transaction().map_err(wrap)?;
        tx.execute_batch(sql).map_err(wrap)?;
        // The version bump rides in the same transaction; user_version is
        // part of the database header and rolls back with it.
        tx.pragma_update(None, "user_version", target_version)
            .map_err(wrap)?;
        tx.commit().map_err(wrap)?;
    }

    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn fresh_conn() -> Connection {
        Connection::open_in_memory().expect("should open in-memory db")
    }

    #[test]
    fn fresh_db_reaches_latest_version() {
        let conn = fresh_conn();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 3, "should apply all migrations");

        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .expect("should read user_version");
        assert_eq!(version, 3);
    }

    #[test]
    fn run_migrations_idempotent() {
        let conn = fresh_conn();

        let first = run_migrations(&conn).expect("first run should succeed");
        assert_eq!(first, 3);

        let second = run_migrations(&conn).expect("second run should succeed");
        assert_eq!(second, 0, "no new migrations to apply");
    }

    #[test]
    fn core_tables_exist_after_migration() {
        let conn = fresh_conn();
        run_migrations(&conn).expect("migrations should succeed");

        for table in ["users", "bots", "conversations"] {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                    [table],
                    |row| row.get(0),
                )
                .expect("should query sqlite_master");
            assert!(exists, "{table} table should exist");
        }
    }

    #[test]
    fn newer_schema_than_build_is_refused() {
        let conn = fresh_conn();
        conn.pragma_update(None, "user_version", 99)
            .expect("should set user_version");

        let err = run_migrations(&conn).expect_err("version ahead should be refused");
        match err {
            MigrationError::VersionAhead { found, known } => {
                assert_eq!(found, 99);
                assert_eq!(known, 3);
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn failed_migration_rolls_back_schema_and_version() {
        let conn = fresh_conn();
        let migrations: &[(&'static str, &str)] = &[(
            "broken",
            "CREATE TABLE rollback_probe (id INTEGER PRIMARY KEY);
             INSERT INTO missing_table VALUES (1);",
        )];

        let err = apply_pending(&conn, migrations).expect_err("broken migration should fail");
        match err {
            MigrationError::Apply { name, .. } => assert_eq!(name, "broken"),
            other => panic!("unexpected error type: {other:?}"),
        }

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'rollback_probe')",
                [],
                |row| row.get(0),
            )
            .expect("should query sqlite_master");
        assert!(!exists, "partial schema should be rolled back");

        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .expect("should read user_version");
        assert_eq!(version, 0, "version bump should be rolled back");
    }

    #[test]
    fn conversations_role_check_constraint() {
        let conn = fresh_conn();
        run_migrations(&conn).expect("migrations should succeed");

        conn.execute("INSERT INTO users (user_id) VALUES ('u-1')", [])
            .expect("seed user");
        conn.execute(
            "INSERT INTO bots (bot_id, user_id, name, system_prompt, voice_id)
             VALUES ('b-1', 'u-1', 'Tutor', 'You help.', 'nova')",
            [],
        )
        .expect("seed bot");

        let err = conn.execute(
            "INSERT INTO conversations (turn_id, bot_id, role, content)
             VALUES ('t-1', 'b-1', 'narrator', 'nope')",
            [],
        );
        assert!(err.is_err(), "role outside user/assistant should be rejected");
    }
}
