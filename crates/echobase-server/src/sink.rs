//! SQLite-backed conversation sink.

use async_trait::async_trait;
use echobase_db::DbPool;
use echobase_voice::{ConversationSink, PersistenceError};

/// Writes (user, assistant) turn pairs through the shared connection pool.
///
/// The underlying store call wraps both inserts in one transaction, so a
/// failure leaves zero new rows. Database work runs on the blocking pool.
pub struct SqliteConversationSink {
    pool: DbPool,
}

impl SqliteConversationSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationSink for SqliteConversationSink {
    async fn append_pair(
        &self,
        bot_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), PersistenceError> {
        let pool = self.pool.clone();
        let bot_id = bot_id.to_string();
        let user_text = user_text.to_string();
        let assistant_text = assistant_text.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| PersistenceError(format!("failed to get connection: {e}")))?;
            echobase_store::append_turn_pair(&conn, &bot_id, &user_text, &assistant_text)
                .map(|_| ())
                .map_err(|e| PersistenceError(e.to_string()))
        })
        .await
        .map_err(|e| PersistenceError(format!("blocking task failed: {e}")))?
    }
}
