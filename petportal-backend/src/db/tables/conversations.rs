//! Conversation and membership operations on the chat database

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::models::Conversation;
use super::super::{parse_datetime, placeholders, ChatDatabase};

impl ChatDatabase {
    fn row_to_conversation(row: &Row) -> SqliteResult<Conversation> {
        let created_at: String = row.get(2)?;
        Ok(Conversation {
            id: row.get(0)?,
            subject: row.get(1)?,
            created_at: parse_datetime(2, &created_at)?,
        })
    }

    // ============================================
    // Conversation methods
    // ============================================

    pub fn create_conversation(&self, subject: &str) -> SqliteResult<Conversation> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_conversations (subject, created_at) VALUES (?1, ?2)",
            rusqlite::params![subject, now.to_rfc3339()],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            subject: subject.to_string(),
            created_at: now,
        })
    }

    pub fn get_conversation(&self, id: i64) -> SqliteResult<Option<Conversation>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, subject, created_at FROM chat_conversations WHERE id = ?1",
            [id],
            Self::row_to_conversation,
        )
        .optional()
    }

    /// Every conversation, newest first
    pub fn list_conversations(&self) -> SqliteResult<Vec<Conversation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, subject, created_at FROM chat_conversations ORDER BY created_at DESC, id DESC",
        )?;

        let conversations = stmt
            .query_map([], Self::row_to_conversation)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(conversations)
    }

    /// Conversations the user is a member of, newest first
    pub fn list_conversations_for_user(&self, user_id: i64) -> SqliteResult<Vec<Conversation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.subject, c.created_at
             FROM chat_conversations c
             JOIN chat_members m ON m.conversation_id = c.id
             WHERE m.user_id = ?1
             ORDER BY c.created_at DESC, c.id DESC",
        )?;

        let conversations = stmt
            .query_map([user_id], Self::row_to_conversation)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(conversations)
    }

    /// Lowest-id conversation whose members include every given user.
    /// With `subject_tag`, the subject must also contain that tag.
    pub fn find_conversation_with_members(
        &self,
        user_ids: &[i64],
        subject_tag: Option<&str>,
    ) -> SqliteResult<Option<Conversation>> {
        let mut ids = user_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(None);
        }

        let count_idx = ids.len() + 1;
        let tag_idx = ids.len() + 2;
        let sql = format!(
            "SELECT c.id, c.subject, c.created_at
             FROM chat_conversations c
             WHERE c.id IN (
                 SELECT conversation_id FROM chat_members
                 WHERE user_id IN ({})
                 GROUP BY conversation_id
                 HAVING COUNT(DISTINCT user_id) = ?{}
             )
             AND (?{tag} IS NULL OR instr(c.subject, ?{tag}) > 0)
             ORDER BY c.id
             LIMIT 1",
            placeholders(ids.len()),
            count_idx,
            tag = tag_idx,
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = ids
            .iter()
            .map(|id| Box::new(*id) as Box<dyn rusqlite::ToSql>)
            .collect();
        params.push(Box::new(ids.len() as i64));
        params.push(Box::new(subject_tag.map(String::from)));

        let conn = self.conn();
        conn.query_row(
            &sql,
            rusqlite::params_from_iter(params.iter()),
            Self::row_to_conversation,
        )
        .optional()
    }

    /// Delete a conversation with its messages and members in one transaction
    pub fn delete_conversation(&self, id: i64) -> SqliteResult<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chat_messages WHERE conversation_id = ?1", [id])?;
        tx.execute("DELETE FROM chat_members WHERE conversation_id = ?1", [id])?;
        let rows = tx.execute("DELETE FROM chat_conversations WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // ============================================
    // Membership methods
    // ============================================

    /// Add a member; existing memberships are left alone
    pub fn add_member(&self, conversation_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO chat_members (conversation_id, user_id) VALUES (?1, ?2)",
            [conversation_id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn add_members(&self, conversation_id: i64, user_ids: &[i64]) -> SqliteResult<()> {
        for user_id in user_ids {
            self.add_member(conversation_id, *user_id)?;
        }
        Ok(())
    }

    pub fn remove_member(&self, conversation_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "DELETE FROM chat_members WHERE conversation_id = ?1 AND user_id = ?2",
            [conversation_id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn is_member(&self, conversation_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_members WHERE conversation_id = ?1 AND user_id = ?2",
            [conversation_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Member user ids in join order
    pub fn member_ids(&self, conversation_id: i64) -> SqliteResult<Vec<i64>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT user_id FROM chat_members WHERE conversation_id = ?1 ORDER BY id")?;

        let ids = stmt
            .query_map([conversation_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::ChatDatabase;

    fn chat() -> ChatDatabase {
        ChatDatabase::new(":memory:").unwrap()
    }

    #[test]
    fn test_membership_is_unique() {
        let db = chat();
        let convo = db.create_conversation("About Rex (pet:1)").unwrap();
        assert!(db.add_member(convo.id, 1).unwrap());
        assert!(!db.add_member(convo.id, 1).unwrap());
        assert_eq!(db.member_ids(convo.id).unwrap(), vec![1]);
        assert!(db.is_member(convo.id, 1).unwrap());
        assert!(!db.is_member(convo.id, 2).unwrap());
    }

    #[test]
    fn test_find_conversation_requires_all_members_and_tag() {
        let db = chat();
        let rex = db.create_conversation("About Rex (pet:1)").unwrap();
        db.add_members(rex.id, &[1, 2, 9]).unwrap();
        let other = db.create_conversation("About Tom (pet:12)").unwrap();
        db.add_members(other.id, &[1, 2]).unwrap();

        let found = db.find_conversation_with_members(&[2, 1], Some("(pet:1)")).unwrap();
        assert_eq!(found.map(|c| c.id), Some(rex.id));

        let found = db.find_conversation_with_members(&[1, 2], Some("(pet:12)")).unwrap();
        assert_eq!(found.map(|c| c.id), Some(other.id));

        assert!(db.find_conversation_with_members(&[1, 3], None).unwrap().is_none());
        assert!(db.find_conversation_with_members(&[1, 2], Some("(pet:5)")).unwrap().is_none());

        // without a tag the lowest id wins
        let found = db.find_conversation_with_members(&[1, 2, 2], None).unwrap();
        assert_eq!(found.map(|c| c.id), Some(rex.id));
        assert!(db.find_conversation_with_members(&[], None).unwrap().is_none());
    }

    #[test]
    fn test_delete_conversation_removes_members_and_messages() {
        let db = chat();
        let convo = db.create_conversation("Support / Admins").unwrap();
        db.add_members(convo.id, &[1, 2]).unwrap();
        db.create_message(convo.id, Some(1), "hello").unwrap();

        assert!(db.delete_conversation(convo.id).unwrap());
        assert!(db.get_conversation(convo.id).unwrap().is_none());
        assert!(db.member_ids(convo.id).unwrap().is_empty());
        assert!(db.list_messages(convo.id).unwrap().is_empty());
        assert!(!db.delete_conversation(convo.id).unwrap());
    }

    #[test]
    fn test_conversations_for_user() {
        let db = chat();
        let a = db.create_conversation("a").unwrap();
        let b = db.create_conversation("b").unwrap();
        db.add_member(a.id, 1).unwrap();
        db.add_members(b.id, &[1, 2]).unwrap();

        assert_eq!(db.list_conversations_for_user(1).unwrap().len(), 2);
        let for_two = db.list_conversations_for_user(2).unwrap();
        assert_eq!(for_two.len(), 1);
        assert_eq!(for_two[0].id, b.id);
        assert_eq!(db.list_conversations().unwrap().len(), 2);
    }
}
