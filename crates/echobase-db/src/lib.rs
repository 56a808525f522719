//! Database layer for the EchoBase platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every table EchoBase writes — users, bots,
//! conversations — is created through versioned migrations managed here.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process to run; WAL
//!   allows concurrent readers with a single writer, which matches the
//!   append-mostly conversation workload.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so migrations ship with the server and cannot drift
//!   from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, PoolError, PoolOptions};
