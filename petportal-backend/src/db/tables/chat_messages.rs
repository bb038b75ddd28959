//! Chat message operations on the chat database

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::models::ChatMessage;
use super::super::{parse_datetime, ChatDatabase};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, text, created_at, read";

impl ChatDatabase {
    fn row_to_message(row: &Row) -> SqliteResult<ChatMessage> {
        let created_at: String = row.get(4)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            text: row.get(3)?,
            created_at: parse_datetime(4, &created_at)?,
            read: row.get(5)?,
        })
    }

    pub fn create_message(
        &self,
        conversation_id: i64,
        sender_id: Option<i64>,
        text: &str,
    ) -> SqliteResult<ChatMessage> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_messages (conversation_id, sender_id, text, created_at, read)
             VALUES (?1, ?2, ?3, ?4, 0)",
            rusqlite::params![conversation_id, sender_id, text, now.to_rfc3339()],
        )?;

        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            conversation_id,
            sender_id,
            text: text.to_string(),
            created_at: now,
            read: false,
        })
    }

    /// All messages of a conversation, oldest first
    pub fn list_messages(&self, conversation_id: i64) -> SqliteResult<Vec<ChatMessage>> {
        self.list_messages_after(conversation_id, 0)
    }

    /// Messages with an id greater than `after_id`, oldest first
    pub fn list_messages_after(&self, conversation_id: i64, after_id: i64) -> SqliteResult<Vec<ChatMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chat_messages WHERE conversation_id = ?1 AND id > ?2
             ORDER BY created_at, id",
            MESSAGE_COLUMNS
        ))?;

        let messages = stmt
            .query_map([conversation_id, after_id], Self::row_to_message)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(messages)
    }

    pub fn get_message(&self, id: i64) -> SqliteResult<Option<ChatMessage>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM chat_messages WHERE id = ?1", MESSAGE_COLUMNS),
            [id],
            Self::row_to_message,
        )
        .optional()
    }

    /// Delete a message within a conversation
    pub fn delete_message(&self, conversation_id: i64, message_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "DELETE FROM chat_messages WHERE id = ?1 AND conversation_id = ?2",
            [message_id, conversation_id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::ChatDatabase;

    #[test]
    fn test_fetch_after_id() {
        let db = ChatDatabase::new(":memory:").unwrap();
        let convo = db.create_conversation("About Rex (pet:1)").unwrap();
        let first = db.create_message(convo.id, Some(1), "hi").unwrap();
        let second = db.create_message(convo.id, Some(2), "hello").unwrap();
        assert!(!second.read);

        let all = db.list_messages(convo.id).unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![first.id, second.id]);

        let newer = db.list_messages_after(convo.id, first.id).unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].text, "hello");
    }

    #[test]
    fn test_delete_message_is_scoped_to_conversation() {
        let db = ChatDatabase::new(":memory:").unwrap();
        let a = db.create_conversation("a").unwrap();
        let b = db.create_conversation("b").unwrap();
        let msg = db.create_message(a.id, None, "system note").unwrap();

        assert!(!db.delete_message(b.id, msg.id).unwrap());
        assert!(db.get_message(msg.id).unwrap().is_some());
        assert!(db.delete_message(a.id, msg.id).unwrap());
        assert!(db.get_message(msg.id).unwrap().is_none());
    }
}
