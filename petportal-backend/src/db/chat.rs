//! Chat SQLite database - a separate file from the main database
//!
//! Conversations, memberships and messages are stored here. User ids are plain
//! integers with no foreign key into the main database's `users` table.

use rusqlite::{Connection, Result as SqliteResult};
use std::sync::{Mutex, MutexGuard};

use super::router::{self, DbAlias};
use super::{count_tables, open_connection, TableCount};

const SCHEMA: &[(&str, &str)] = &[
    (
        "chat_conversations",
        "CREATE TABLE IF NOT EXISTS chat_conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )",
    ),
    (
        "chat_members",
        "CREATE TABLE IF NOT EXISTS chat_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            FOREIGN KEY (conversation_id) REFERENCES chat_conversations(id) ON DELETE CASCADE,
            UNIQUE(conversation_id, user_id)
        )",
    ),
    (
        "chat_messages",
        "CREATE TABLE IF NOT EXISTS chat_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL,
            sender_id INTEGER,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (conversation_id) REFERENCES chat_conversations(id) ON DELETE CASCADE
        )",
    ),
];

/// Chat database wrapper, one connection guarded by a Mutex
pub struct ChatDatabase {
    pub(crate) conn: Mutex<Connection>,
}

impl ChatDatabase {
    /// Open the chat database and initialize its schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        let conn = open_connection(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();

        for (table, ddl) in SCHEMA {
            if router::allow_migrate(DbAlias::Chat, table) {
                conn.execute(ddl, [])?;
            }
        }

        // Migrate: older chat files kept messages in `chat_message` with a
        // sender foreign key into the auth database. Copy them over and drop it.
        let legacy_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='chat_message'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|c| c > 0)
            .unwrap_or(false);

        if legacy_exists {
            log::info!("Migrating legacy chat_message table into chat_messages");
            conn.execute_batch(
                "INSERT OR IGNORE INTO chat_messages (id, conversation_id, sender_id, text, created_at, read)
                    SELECT id, conversation_id, sender_id, text,
                           COALESCE(created_at, strftime('%Y-%m-%dT%H:%M:%S+00:00', 'now')), COALESCE(read, 0)
                    FROM chat_message;
                 DROP TABLE chat_message;",
            )?;
        }

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_members_user ON chat_members(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation ON chat_messages(conversation_id, id)",
            [],
        )?;

        Ok(())
    }

    /// Record counts for every chat table
    pub fn table_counts(&self) -> Vec<TableCount> {
        let conn = self.conn();
        count_tables(&conn, router::tables_for(DbAlias::Chat))
    }
}
