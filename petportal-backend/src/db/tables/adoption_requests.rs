//! Adoption request database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::models::{AdoptionRequest, AdoptionRequestDetail, PetStatus, ReviewStatus};
use super::super::{parse_datetime, parse_enum, Database};

const DETAIL_SELECT: &str = "SELECT ar.id, ar.pet_id, ar.user_id, ar.status, ar.message, ar.created_at,
            p.name, u.username
     FROM adoption_requests ar
     JOIN pets p ON p.id = ar.pet_id
     JOIN users u ON u.id = ar.user_id";

impl Database {
    fn row_to_adoption_request(row: &Row) -> SqliteResult<AdoptionRequest> {
        let status: String = row.get(3)?;
        let created_at: String = row.get(5)?;
        Ok(AdoptionRequest {
            id: row.get(0)?,
            pet_id: row.get(1)?,
            user_id: row.get(2)?,
            status: parse_enum(3, &status)?,
            message: row.get(4)?,
            created_at: parse_datetime(5, &created_at)?,
        })
    }

    fn row_to_adoption_detail(row: &Row) -> SqliteResult<AdoptionRequestDetail> {
        Ok(AdoptionRequestDetail {
            request: Self::row_to_adoption_request(row)?,
            pet_name: row.get(6)?,
            requester_username: row.get(7)?,
        })
    }

    fn query_adoption_details(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> SqliteResult<Vec<AdoptionRequestDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;

        let requests = stmt
            .query_map(params, Self::row_to_adoption_detail)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(requests)
    }

    /// Create a pending request unless the user already has one for this pet.
    /// Returns `None` for the duplicate case.
    pub fn create_adoption_request(
        &self,
        pet_id: i64,
        user_id: i64,
        message: Option<&str>,
    ) -> SqliteResult<Option<AdoptionRequest>> {
        let conn = self.conn();
        let now = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO adoption_requests (pet_id, user_id, status, message, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE NOT EXISTS (
                 SELECT 1 FROM adoption_requests WHERE pet_id = ?1 AND user_id = ?2 AND status = ?3
             )",
            rusqlite::params![pet_id, user_id, ReviewStatus::Pending.as_ref(), message, now.to_rfc3339()],
        )?;
        if inserted == 0 {
            return Ok(None);
        }

        Ok(Some(AdoptionRequest {
            id: conn.last_insert_rowid(),
            pet_id,
            user_id,
            status: ReviewStatus::Pending,
            message: message.map(String::from),
            created_at: now,
        }))
    }

    pub fn get_adoption_request(&self, id: i64) -> SqliteResult<Option<AdoptionRequest>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, pet_id, user_id, status, message, created_at FROM adoption_requests WHERE id = ?1",
            [id],
            Self::row_to_adoption_request,
        )
        .optional()
    }

    #[cfg(test)]
    pub fn has_pending_adoption_request(&self, pet_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM adoption_requests WHERE pet_id = ?1 AND user_id = ?2 AND status = ?3",
            rusqlite::params![pet_id, user_id, ReviewStatus::Pending.as_ref()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Requests a user has sent, newest first
    pub fn list_sent_adoption_requests(&self, user_id: i64) -> SqliteResult<Vec<AdoptionRequestDetail>> {
        self.query_adoption_details(
            &format!("{} WHERE ar.user_id = ?1 ORDER BY ar.created_at DESC, ar.id DESC", DETAIL_SELECT),
            [user_id],
        )
    }

    /// Requests other users sent for pets owned by `owner_id`, optionally filtered by status
    pub fn list_received_adoption_requests(
        &self,
        owner_id: i64,
        status: Option<ReviewStatus>,
    ) -> SqliteResult<Vec<AdoptionRequestDetail>> {
        match status {
            Some(status) => self.query_adoption_details(
                &format!(
                    "{} WHERE p.owner_id = ?1 AND ar.user_id != ?1 AND ar.status = ?2
                     ORDER BY ar.created_at DESC, ar.id DESC",
                    DETAIL_SELECT
                ),
                rusqlite::params![owner_id, status.as_ref()],
            ),
            None => self.query_adoption_details(
                &format!(
                    "{} WHERE p.owner_id = ?1 AND ar.user_id != ?1 ORDER BY ar.created_at DESC, ar.id DESC",
                    DETAIL_SELECT
                ),
                [owner_id],
            ),
        }
    }

    /// Record the owner's decision; approval also marks the pet adopted
    pub fn review_adoption_request(&self, id: i64, status: ReviewStatus) -> SqliteResult<bool> {
        let Some(request) = self.get_adoption_request(id)? else {
            return Ok(false);
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE adoption_requests SET status = ?1 WHERE id = ?2",
            rusqlite::params![status.as_ref(), id],
        )?;
        if status == ReviewStatus::Approved {
            tx.execute(
                "UPDATE pets SET status = ?1 WHERE id = ?2",
                rusqlite::params![PetStatus::Adopted.as_ref(), request.pet_id],
            )?;
        }
        tx.commit()?;

        Ok(true)
    }

    pub fn count_pending_adoption_requests(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM adoption_requests WHERE status = ?1",
            [ReviewStatus::Pending.as_ref()],
            |row| row.get(0),
        )
    }
}
