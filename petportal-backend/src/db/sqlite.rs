//! Main SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init)
//! - Schema creation
//!
//! All table operations are in the tables/ subdirectory.

use rusqlite::{Connection, Result as SqliteResult};
use std::sync::{Mutex, MutexGuard};

use super::router::{self, DbAlias};
use super::{count_tables, open_connection, TableCount};

/// Table definitions for the main database, keyed by table name
const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            is_staff INTEGER NOT NULL DEFAULT 0,
            is_superuser INTEGER NOT NULL DEFAULT 0,
            date_joined TEXT NOT NULL
        )",
    ),
    (
        "user_profiles",
        "CREATE TABLE IF NOT EXISTS user_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER UNIQUE NOT NULL,
            age INTEGER,
            phone_number TEXT,
            gender TEXT,
            location TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "admin_profiles",
        "CREATE TABLE IF NOT EXISTS admin_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER UNIQUE NOT NULL,
            is_super_admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "auth_sessions",
        "CREATE TABLE IF NOT EXISTS auth_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT UNIQUE NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "password_reset_tokens",
        "CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT UNIQUE NOT NULL,
            user_id INTEGER NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "pets",
        "CREATE TABLE IF NOT EXISTS pets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            species TEXT NOT NULL,
            breed TEXT,
            color TEXT,
            age TEXT,
            gender TEXT NOT NULL DEFAULT 'unknown',
            status TEXT NOT NULL DEFAULT 'for_adoption',
            location TEXT NOT NULL,
            description TEXT,
            contact_email TEXT,
            contact_phone TEXT,
            owner_id INTEGER,
            image TEXT,
            date_added TEXT NOT NULL,
            found_date TEXT,
            FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
        )",
    ),
    (
        "pet_registration_requests",
        "CREATE TABLE IF NOT EXISTS pet_registration_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            species TEXT NOT NULL,
            breed TEXT,
            color TEXT,
            age TEXT,
            gender TEXT NOT NULL DEFAULT 'unknown',
            pet_status TEXT NOT NULL DEFAULT 'for_adoption',
            location TEXT NOT NULL,
            description TEXT,
            contact_email TEXT,
            contact_phone TEXT,
            image TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            admin_notes TEXT,
            reviewed_by INTEGER,
            created_at TEXT NOT NULL,
            reviewed_at TEXT,
            created_pet_id INTEGER,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (reviewed_by) REFERENCES users(id) ON DELETE SET NULL,
            FOREIGN KEY (created_pet_id) REFERENCES pets(id) ON DELETE SET NULL
        )",
    ),
    (
        "adoption_requests",
        "CREATE TABLE IF NOT EXISTS adoption_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pet_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            message TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (pet_id) REFERENCES pets(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "notifications",
        "CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            actor_id INTEGER,
            verb TEXT NOT NULL,
            message TEXT,
            url TEXT,
            unread INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (actor_id) REFERENCES users(id) ON DELETE SET NULL
        )",
    ),
];

/// Main database wrapper, one connection guarded by a Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        let conn = open_connection(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Lock the connection, recovering it if a previous holder panicked
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize all tables this database owns
    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();

        for (table, ddl) in SCHEMA {
            if router::allow_migrate(DbAlias::Default, table) {
                conn.execute(ddl, [])?;
            }
        }

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pets_status ON pets(status, date_added)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pets_owner ON pets(owner_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, unread)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_adoption_requests_pet ON adoption_requests(pet_id, status)",
            [],
        )?;

        Ok(())
    }

    /// Record counts for every main-database table
    pub fn table_counts(&self) -> Vec<TableCount> {
        let conn = self.conn();
        count_tables(&conn, router::tables_for(DbAlias::Default))
    }
}
