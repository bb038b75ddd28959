//! Database layer
//!
//! The portal keeps two physically separate SQLite files:
//! - the main database (users, pets, requests, notifications) behind `Database`
//! - the chat database (conversations, members, messages) behind `ChatDatabase`
//!
//! Nothing joins across the two. Chat rows reference users by integer id only,
//! and callers combine results in memory.

pub mod chat;
pub mod router;
pub mod sqlite;
mod tables;

pub use chat::ChatDatabase;
pub use router::DbAlias;
pub use sqlite::Database;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

/// Record count of a single table, as reported by status tooling
#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub count: Option<i64>,
    pub error: Option<String>,
}

/// Open a SQLite connection, creating the parent directory when needed
pub(crate) fn open_connection(database_url: &str) -> rusqlite::Result<Connection> {
    if let Some(parent) = Path::new(database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let conn = Connection::open(database_url)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Parse a timestamp column into UTC.
///
/// Rows written by this crate are RFC 3339. Rows carried over from older
/// files may hold naive `YYYY-MM-DD HH:MM:SS[.ffffff]` values, read as UTC.
pub(crate) fn parse_datetime(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional RFC 3339 column value
pub(crate) fn parse_optional_datetime(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_datetime(idx, &s)).transpose()
}

/// Parse a text column holding a strum-backed enum value
pub(crate) fn parse_enum<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Build `?1, ?2, ...` placeholders for an IN clause
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Count rows in each of the given tables
pub(crate) fn count_tables(conn: &Connection, tables: &[&str]) -> Vec<TableCount> {
    tables
        .iter()
        .map(|table| {
            match conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            }) {
                Ok(count) => TableCount {
                    table: table.to_string(),
                    count: Some(count),
                    error: None,
                },
                Err(e) => TableCount {
                    table: table.to_string(),
                    count: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{ChatDatabase, Database};
    use crate::models::{NewPet, Pet, PetStatus, Species, User};
    use std::sync::Arc;

    pub fn memory_databases() -> (Arc<Database>, Arc<ChatDatabase>) {
        let db = Database::new(":memory:").expect("main db");
        let chat_db = ChatDatabase::new(":memory:").expect("chat db");
        (Arc::new(db), Arc::new(chat_db))
    }

    pub fn user(db: &Database, username: &str) -> User {
        db.create_user(username, &format!("{}@example.com", username), "hash", false, false)
            .expect("create user")
    }

    pub fn admin(db: &Database, username: &str) -> User {
        db.create_user(username, &format!("{}@example.com", username), "hash", true, true)
            .expect("create admin")
    }

    pub fn pet(db: &Database, name: &str, owner: Option<&User>) -> Pet {
        db.create_pet(&NewPet {
            name: name.to_string(),
            species: Species::Dog,
            status: PetStatus::ForAdoption,
            location: "Here".to_string(),
            owner_id: owner.map(|u| u.id),
            ..NewPet::default()
        })
        .expect("create pet")
    }
}
