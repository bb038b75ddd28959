//! User, profile and admin profile database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;

use crate::models::{AdminProfile, ProfileGender, User, UserOverview, UserProfile};
use super::super::{parse_datetime, parse_enum, placeholders, Database};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, is_superuser, date_joined";

impl Database {
    fn row_to_user(row: &Row) -> SqliteResult<User> {
        let date_joined: String = row.get(6)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            is_staff: row.get(4)?,
            is_superuser: row.get(5)?,
            date_joined: parse_datetime(6, &date_joined)?,
        })
    }

    fn row_to_profile(row: &Row) -> SqliteResult<UserProfile> {
        let gender: Option<String> = row.get(4)?;
        Ok(UserProfile {
            id: row.get(0)?,
            user_id: row.get(1)?,
            age: row.get(2)?,
            phone_number: row.get(3)?,
            gender: gender.map(|g| parse_enum(4, &g)).transpose()?,
            location: row.get(5)?,
        })
    }

    // ============================================
    // User methods
    // ============================================

    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> SqliteResult<User> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![username, email, password_hash, is_staff, is_superuser, now.to_rfc3339()],
        )?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_staff,
            is_superuser,
            date_joined: now,
        })
    }

    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            Self::row_to_user,
        )
        .optional()
    }

    pub fn get_user_by_username(&self, username: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            [username],
            Self::row_to_user,
        )
        .optional()
    }

    /// First user registered with this e-mail address (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE lower(email) = lower(?1) ORDER BY id LIMIT 1",
                USER_COLUMNS
            ),
            [email],
            Self::row_to_user,
        )
        .optional()
    }

    /// All users, most recently joined first
    pub fn list_users(&self) -> SqliteResult<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY date_joined DESC, id DESC",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(users)
    }

    pub fn update_password(&self, user_id: i64, password_hash: &str) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            rusqlite::params![password_hash, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Staff and superusers, optionally leaving one user out
    pub fn list_admin_users(&self, exclude_user_id: Option<i64>) -> SqliteResult<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users
             WHERE (is_staff = 1 OR is_superuser = 1) AND id != ?1
             ORDER BY username",
            USER_COLUMNS
        ))?;

        let admins = stmt
            .query_map([exclude_user_id.unwrap_or(-1)], Self::row_to_user)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(admins)
    }

    /// Admin rights come from the staff/superuser flags or an admin profile
    pub fn is_admin(&self, user: &User) -> SqliteResult<bool> {
        if user.has_admin_flags() {
            return Ok(true);
        }
        self.has_admin_profile(user.id)
    }

    /// Resolve usernames for a set of user ids; unknown ids are left out
    pub fn usernames_by_ids(&self, ids: &[i64]) -> SqliteResult<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, username FROM users WHERE id IN ({})",
            placeholders(ids.len())
        ))?;

        let names = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(names)
    }

    pub fn count_users(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
    }

    pub fn count_users_joined_since(&self, since: DateTime<Utc>) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE date_joined >= ?1",
            [since.to_rfc3339()],
            |row| row.get(0),
        )
    }

    // ============================================
    // Profile methods
    // ============================================

    pub fn create_user_profile(
        &self,
        user_id: i64,
        age: Option<i64>,
        phone_number: Option<&str>,
        gender: Option<ProfileGender>,
        location: Option<&str>,
    ) -> SqliteResult<UserProfile> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO user_profiles (user_id, age, phone_number, gender, location)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, age, phone_number, gender.map(|g| g.to_string()), location],
        )?;

        Ok(UserProfile {
            id: conn.last_insert_rowid(),
            user_id,
            age,
            phone_number: phone_number.map(String::from),
            gender,
            location: location.map(String::from),
        })
    }

    pub fn get_user_profile(&self, user_id: i64) -> SqliteResult<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, age, phone_number, gender, location FROM user_profiles WHERE user_id = ?1",
            [user_id],
            Self::row_to_profile,
        )
        .optional()
    }

    /// Every user with profile (if any) and owned-pet count, newest first
    pub fn list_user_overviews(&self) -> SqliteResult<Vec<UserOverview>> {
        let pet_counts: HashMap<i64, i64> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT owner_id, COUNT(*) FROM pets WHERE owner_id IS NOT NULL GROUP BY owner_id",
            )?;
            let counts = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();
            counts
        };

        self.list_users()?
            .into_iter()
            .map(|user| {
                let profile = self.get_user_profile(user.id)?;
                let pet_count = pet_counts.get(&user.id).copied().unwrap_or(0);
                Ok(UserOverview {
                    user,
                    profile,
                    pet_count,
                })
            })
            .collect()
    }

    // ============================================
    // Admin profile methods
    // ============================================

    pub fn count_admin_profiles(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM admin_profiles", [], |row| row.get(0))
    }

    pub fn has_admin_profile(&self, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM admin_profiles WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn create_admin_profile(&self, user_id: i64, is_super_admin: bool) -> SqliteResult<AdminProfile> {
        let conn = self.conn();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO admin_profiles (user_id, is_super_admin, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id, is_super_admin, now.to_rfc3339()],
        )?;

        Ok(AdminProfile {
            id: conn.last_insert_rowid(),
            user_id,
            is_super_admin,
            created_at: now,
        })
    }
}
