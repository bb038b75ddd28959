use std::path::Path;

use crate::db::{ChatDatabase, Database, TableCount};

/// Availability and per-table counts of one database
#[derive(Debug)]
pub struct DatabaseStatus {
    pub alias: &'static str,
    pub path: String,
    pub error: Option<String>,
    pub tables: Vec<TableCount>,
}

impl DatabaseStatus {
    pub fn available(&self) -> bool {
        self.error.is_none()
    }
}

const MISSING_FILE: &str = "database file not found";

fn status(alias: &'static str, path: &str, opened: Result<Vec<TableCount>, String>) -> DatabaseStatus {
    match opened {
        Ok(tables) => DatabaseStatus {
            alias,
            path: path.to_string(),
            error: None,
            tables,
        },
        Err(e) => DatabaseStatus {
            alias,
            path: path.to_string(),
            error: Some(e),
            tables: Vec::new(),
        },
    }
}

/// Opening creates missing files, so only open what is already there
fn open_existing<T>(
    path: &str,
    open: impl FnOnce(&str) -> rusqlite::Result<T>,
    counts: impl FnOnce(&T) -> Vec<TableCount>,
) -> Result<Vec<TableCount>, String> {
    if path != ":memory:" && !Path::new(path).exists() {
        return Err(MISSING_FILE.to_string());
    }
    open(path).map(|db| counts(&db)).map_err(|e| e.to_string())
}

/// Open both databases and collect their record counts
pub fn collect(database_url: &str, chat_database_url: &str) -> Vec<DatabaseStatus> {
    vec![
        status(
            "default",
            database_url,
            open_existing(database_url, Database::new, Database::table_counts),
        ),
        status(
            "chat_db",
            chat_database_url,
            open_existing(chat_database_url, ChatDatabase::new, ChatDatabase::table_counts),
        ),
    ]
}

pub fn run(database_url: &str, chat_database_url: &str) -> Vec<DatabaseStatus> {
    let statuses = collect(database_url, chat_database_url);

    for db in &statuses {
        match &db.error {
            None => println!("[{}] {}: available", db.alias, db.path),
            Some(e) => println!("[{}] {}: unavailable ({})", db.alias, db.path, e),
        }
        for table in &db.tables {
            match (table.count, &table.error) {
                (Some(count), _) => println!("  {:<28} {}", table.table, count),
                (None, Some(e)) => println!("  {:<28} error: {}", table.table, e),
                (None, None) => println!("  {:<28} -", table.table),
            }
        }
    }

    statuses
}
