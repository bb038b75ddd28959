//! Pet registration request database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::models::{NewPet, NewRegistrationRequest, PetRegistrationRequest, PetStatus, ReviewStatus};
use super::super::{parse_datetime, parse_enum, parse_optional_datetime, Database};

const REGISTRATION_COLUMNS: &str = "id, user_id, name, species, breed, color, age, gender, pet_status, location,
     description, contact_email, contact_phone, image, status, admin_notes, reviewed_by, created_at,
     reviewed_at, created_pet_id";

impl Database {
    fn row_to_registration(row: &Row) -> SqliteResult<PetRegistrationRequest> {
        let species: String = row.get(3)?;
        let gender: String = row.get(7)?;
        let pet_status: String = row.get(8)?;
        let status: String = row.get(14)?;
        let created_at: String = row.get(17)?;

        Ok(PetRegistrationRequest {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            species: parse_enum(3, &species)?,
            breed: row.get(4)?,
            color: row.get(5)?,
            age: row.get(6)?,
            gender: parse_enum(7, &gender)?,
            pet_status: parse_enum(8, &pet_status)?,
            location: row.get(9)?,
            description: row.get(10)?,
            contact_email: row.get(11)?,
            contact_phone: row.get(12)?,
            image: row.get(13)?,
            status: parse_enum(14, &status)?,
            admin_notes: row.get(15)?,
            reviewed_by: row.get(16)?,
            created_at: parse_datetime(17, &created_at)?,
            reviewed_at: parse_optional_datetime(18, row.get(18)?)?,
            created_pet_id: row.get(19)?,
        })
    }

    fn query_registrations(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> SqliteResult<Vec<PetRegistrationRequest>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;

        let requests = stmt
            .query_map(params, Self::row_to_registration)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(requests)
    }

    pub fn create_registration_request(
        &self,
        user_id: i64,
        form: &NewRegistrationRequest,
    ) -> SqliteResult<PetRegistrationRequest> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO pet_registration_requests (user_id, name, species, breed, color, age, gender,
             pet_status, location, description, contact_email, contact_phone, image, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                user_id,
                &form.name,
                form.species.as_ref(),
                &form.breed,
                &form.color,
                &form.age,
                form.gender.as_ref(),
                form.pet_status.as_ref(),
                &form.location,
                &form.description,
                &form.contact_email,
                &form.contact_phone,
                &form.image,
                ReviewStatus::Pending.as_ref(),
                &now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_registration_request(id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_registration_request(&self, id: i64) -> SqliteResult<Option<PetRegistrationRequest>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM pet_registration_requests WHERE id = ?1", REGISTRATION_COLUMNS),
            [id],
            Self::row_to_registration,
        )
        .optional()
    }

    /// A user's own requests, newest first
    pub fn list_registration_requests_for_user(
        &self,
        user_id: i64,
    ) -> SqliteResult<Vec<PetRegistrationRequest>> {
        self.query_registrations(
            &format!(
                "SELECT {} FROM pet_registration_requests WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
                REGISTRATION_COLUMNS
            ),
            [user_id],
        )
    }

    pub fn list_pending_registration_requests(&self) -> SqliteResult<Vec<PetRegistrationRequest>> {
        self.query_registrations(
            &format!(
                "SELECT {} FROM pet_registration_requests WHERE status = ?1 ORDER BY created_at DESC, id DESC",
                REGISTRATION_COLUMNS
            ),
            [ReviewStatus::Pending.as_ref()],
        )
    }

    pub fn list_recent_registration_requests(&self, limit: i64) -> SqliteResult<Vec<PetRegistrationRequest>> {
        self.query_registrations(
            &format!(
                "SELECT {} FROM pet_registration_requests ORDER BY created_at DESC, id DESC LIMIT ?1",
                REGISTRATION_COLUMNS
            ),
            [limit],
        )
    }

    pub fn count_pending_registration_requests(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM pet_registration_requests WHERE status = ?1",
            [ReviewStatus::Pending.as_ref()],
            |row| row.get(0),
        )
    }

    /// Approve a pending request: create the pet and link it to the request.
    /// Returns `None` when the request is missing or no longer pending.
    ///
    /// The status flip, the pet insert and the link run in one transaction
    /// under a single lock, so a request yields at most one pet.
    pub fn approve_registration_request(
        &self,
        id: i64,
        reviewer_id: i64,
        admin_notes: &str,
    ) -> SqliteResult<Option<PetRegistrationRequest>> {
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;

            let claimed = tx.execute(
                "UPDATE pet_registration_requests
                 SET status = ?1, admin_notes = ?2, reviewed_by = ?3, reviewed_at = ?4
                 WHERE id = ?5 AND status = ?6",
                rusqlite::params![
                    ReviewStatus::Approved.as_ref(),
                    admin_notes,
                    reviewer_id,
                    Utc::now().to_rfc3339(),
                    id,
                    ReviewStatus::Pending.as_ref(),
                ],
            )?;
            if claimed == 0 {
                return Ok(None);
            }

            let request = tx.query_row(
                &format!("SELECT {} FROM pet_registration_requests WHERE id = ?1", REGISTRATION_COLUMNS),
                [id],
                Self::row_to_registration,
            )?;

            let contact_email = match request.contact_email.as_deref().filter(|e| !e.is_empty()) {
                Some(email) => Some(email.to_string()),
                None => tx
                    .query_row("SELECT email FROM users WHERE id = ?1", [request.user_id], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?,
            };
            let status = PetStatus::from(request.pet_status);
            let found_date = (status == PetStatus::Found).then(Utc::now);

            let pet_id = Self::insert_pet(
                &tx,
                &NewPet {
                    name: request.name,
                    species: request.species,
                    breed: request.breed,
                    color: request.color,
                    age: request.age,
                    gender: request.gender,
                    status,
                    location: request.location,
                    description: request.description,
                    contact_email,
                    contact_phone: request.contact_phone,
                    owner_id: Some(request.user_id),
                    image: request.image,
                    found_date,
                },
            )?;

            tx.execute(
                "UPDATE pet_registration_requests SET created_pet_id = ?1 WHERE id = ?2",
                rusqlite::params![pet_id, id],
            )?;
            tx.commit()?;
        }

        self.get_registration_request(id)
    }

    /// Reject a pending request. Returns `None` when it is missing or not pending.
    pub fn reject_registration_request(
        &self,
        id: i64,
        reviewer_id: i64,
        admin_notes: &str,
    ) -> SqliteResult<Option<PetRegistrationRequest>> {
        let rows = {
            let conn = self.conn();
            conn.execute(
                "UPDATE pet_registration_requests
                 SET status = ?1, admin_notes = ?2, reviewed_by = ?3, reviewed_at = ?4
                 WHERE id = ?5 AND status = ?6",
                rusqlite::params![
                    ReviewStatus::Rejected.as_ref(),
                    admin_notes,
                    reviewer_id,
                    Utc::now().to_rfc3339(),
                    id,
                    ReviewStatus::Pending.as_ref(),
                ],
            )?
        };

        if rows == 0 {
            return Ok(None);
        }
        self.get_registration_request(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{admin, memory_databases, user};
    use crate::models::{NewRegistrationRequest, PetStatus, RegistrationPetStatus, ReviewStatus};

    fn form(pet_status: RegistrationPetStatus) -> NewRegistrationRequest {
        NewRegistrationRequest {
            name: "Biscuit".to_string(),
            pet_status,
            location: "Town".to_string(),
            ..NewRegistrationRequest::default()
        }
    }

    #[test]
    fn test_approve_creates_pet_with_fallback_email() {
        let (db, _) = memory_databases();
        let alice = user(&db, "alice");
        let boss = admin(&db, "boss");

        let request = db
            .create_registration_request(alice.id, &form(RegistrationPetStatus::Found))
            .unwrap();
        assert_eq!(request.status, ReviewStatus::Pending);

        let approved = db
            .approve_registration_request(request.id, boss.id, "looks good")
            .unwrap()
            .unwrap();
        assert_eq!(approved.status, ReviewStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(boss.id));
        assert!(approved.reviewed_at.is_some());

        let pet = db.get_pet(approved.created_pet_id.unwrap()).unwrap().unwrap();
        assert_eq!(pet.owner_id, Some(alice.id));
        assert_eq!(pet.contact_email.as_deref(), Some("alice@example.com"));
        assert_eq!(pet.status, PetStatus::Found);
        assert!(pet.found_date.is_some());

        // already reviewed
        assert!(db.approve_registration_request(request.id, boss.id, "").unwrap().is_none());
        assert!(db.reject_registration_request(request.id, boss.id, "").unwrap().is_none());
        assert_eq!(db.count_pets().unwrap(), 1);
    }

    #[test]
    fn test_reject_and_listings() {
        let (db, _) = memory_databases();
        let alice = user(&db, "alice");
        let boss = admin(&db, "boss");

        let first = db
            .create_registration_request(alice.id, &form(RegistrationPetStatus::ForAdoption))
            .unwrap();
        db.create_registration_request(alice.id, &form(RegistrationPetStatus::Lost))
            .unwrap();
        assert_eq!(db.count_pending_registration_requests().unwrap(), 2);

        let rejected = db
            .reject_registration_request(first.id, boss.id, "blurry photo")
            .unwrap()
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert_eq!(rejected.admin_notes.as_deref(), Some("blurry photo"));

        assert_eq!(db.list_pending_registration_requests().unwrap().len(), 1);
        assert_eq!(db.list_registration_requests_for_user(alice.id).unwrap().len(), 2);
        assert_eq!(db.list_recent_registration_requests(50).unwrap().len(), 2);
        assert_eq!(db.count_pets().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_approvals_create_one_pet() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.sqlite3");
        let db = Arc::new(crate::db::Database::new(path.to_str().unwrap()).unwrap());
        let alice = user(&db, "alice");
        let boss = admin(&db, "boss");

        for round in 0..20 {
            let request = db
                .create_registration_request(alice.id, &form(RegistrationPetStatus::ForAdoption))
                .unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let db = db.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        db.approve_registration_request(request.id, boss.id, "").unwrap()
                    })
                })
                .collect();
            let approved = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(Option::is_some)
                .count();

            assert_eq!(approved, 1);
            assert_eq!(db.count_pets().unwrap(), round + 1);
        }
    }
}
