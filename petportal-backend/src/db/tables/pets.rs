//! Pet database operations

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::models::{NewPet, Pet, PetInput, PetStatus};
use super::super::{parse_datetime, parse_enum, parse_optional_datetime, Database};

const PET_COLUMNS: &str = "id, name, species, breed, color, age, gender, status, location, description,
     contact_email, contact_phone, owner_id, image, date_added, found_date";

impl Database {
    fn row_to_pet(row: &Row) -> SqliteResult<Pet> {
        let species: String = row.get(2)?;
        let gender: String = row.get(6)?;
        let status: String = row.get(7)?;
        let date_added: String = row.get(14)?;

        Ok(Pet {
            id: row.get(0)?,
            name: row.get(1)?,
            species: parse_enum(2, &species)?,
            breed: row.get(3)?,
            color: row.get(4)?,
            age: row.get(5)?,
            gender: parse_enum(6, &gender)?,
            status: parse_enum(7, &status)?,
            location: row.get(8)?,
            description: row.get(9)?,
            contact_email: row.get(10)?,
            contact_phone: row.get(11)?,
            owner_id: row.get(12)?,
            image: row.get(13)?,
            date_added: parse_datetime(14, &date_added)?,
            found_date: parse_optional_datetime(15, row.get(15)?)?,
        })
    }

    fn query_pets(&self, sql: &str, params: impl rusqlite::Params) -> SqliteResult<Vec<Pet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;

        let pets = stmt
            .query_map(params, Self::row_to_pet)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(pets)
    }

    /// Insert a pet on an already locked connection (or open transaction)
    pub(super) fn insert_pet(conn: &Connection, pet: &NewPet) -> SqliteResult<i64> {
        conn.execute(
            "INSERT INTO pets (name, species, breed, color, age, gender, status, location, description,
             contact_email, contact_phone, owner_id, image, date_added, found_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                &pet.name,
                pet.species.as_ref(),
                &pet.breed,
                &pet.color,
                &pet.age,
                pet.gender.as_ref(),
                pet.status.as_ref(),
                &pet.location,
                &pet.description,
                &pet.contact_email,
                &pet.contact_phone,
                pet.owner_id,
                &pet.image,
                Utc::now().to_rfc3339(),
                pet.found_date.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn create_pet(&self, pet: &NewPet) -> SqliteResult<Pet> {
        let id = {
            let conn = self.conn();
            Self::insert_pet(&conn, pet)?
        };
        self.get_pet(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_pet(&self, id: i64) -> SqliteResult<Option<Pet>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM pets WHERE id = ?1", PET_COLUMNS),
            [id],
            Self::row_to_pet,
        )
        .optional()
    }

    /// Pets with the given status, newest first
    pub fn list_pets_by_status(&self, status: PetStatus) -> SqliteResult<Vec<Pet>> {
        self.query_pets(
            &format!(
                "SELECT {} FROM pets WHERE status = ?1 ORDER BY date_added DESC, id DESC",
                PET_COLUMNS
            ),
            [status.as_ref()],
        )
    }

    pub fn list_all_pets(&self) -> SqliteResult<Vec<Pet>> {
        self.query_pets(
            &format!("SELECT {} FROM pets ORDER BY date_added DESC, id DESC", PET_COLUMNS),
            [],
        )
    }

    pub fn list_recent_pets(&self, limit: i64) -> SqliteResult<Vec<Pet>> {
        self.query_pets(
            &format!(
                "SELECT {} FROM pets ORDER BY date_added DESC, id DESC LIMIT ?1",
                PET_COLUMNS
            ),
            [limit],
        )
    }

    pub fn list_pets_by_owner(&self, owner_id: i64) -> SqliteResult<Vec<Pet>> {
        self.query_pets(
            &format!(
                "SELECT {} FROM pets WHERE owner_id = ?1 ORDER BY date_added DESC, id DESC",
                PET_COLUMNS
            ),
            [owner_id],
        )
    }

    /// Other pets of the same species and status
    pub fn list_similar_pets(&self, pet: &Pet, limit: i64) -> SqliteResult<Vec<Pet>> {
        self.query_pets(
            &format!(
                "SELECT {} FROM pets WHERE species = ?1 AND status = ?2 AND id != ?3
                 ORDER BY date_added DESC, id DESC LIMIT ?4",
                PET_COLUMNS
            ),
            rusqlite::params![pet.species.as_ref(), pet.status.as_ref(), pet.id, limit],
        )
    }

    /// Overwrite the editable fields of a pet
    pub fn update_pet(
        &self,
        id: i64,
        input: &PetInput,
        found_date: Option<DateTime<Utc>>,
    ) -> SqliteResult<bool> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE pets SET name = ?1, species = ?2, breed = ?3, color = ?4, age = ?5, gender = ?6,
             status = ?7, location = ?8, description = ?9, contact_email = ?10, contact_phone = ?11,
             image = COALESCE(?12, image), found_date = ?13
             WHERE id = ?14",
            rusqlite::params![
                &input.name,
                input.species.as_ref(),
                &input.breed,
                &input.color,
                &input.age,
                input.gender.as_ref(),
                input.status.as_ref(),
                &input.location,
                &input.description,
                &input.contact_email,
                &input.contact_phone,
                &input.image,
                found_date.map(|d| d.to_rfc3339()),
                id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Change a pet's status. Switching into `found` stamps the found date.
    pub fn set_pet_status(&self, id: i64, status: PetStatus) -> SqliteResult<Option<Pet>> {
        let Some(pet) = self.get_pet(id)? else {
            return Ok(None);
        };

        let found_date = if status == PetStatus::Found && pet.status != PetStatus::Found {
            Some(Utc::now())
        } else {
            pet.found_date
        };

        {
            let conn = self.conn();
            conn.execute(
                "UPDATE pets SET status = ?1, found_date = ?2 WHERE id = ?3",
                rusqlite::params![status.as_ref(), found_date.map(|d| d.to_rfc3339()), id],
            )?;
        }

        self.get_pet(id)
    }

    /// Move every found pet past the waiting period into adoption.
    /// Returns the pets that moved.
    pub fn move_found_pets_to_adoption(&self, now: DateTime<Utc>) -> SqliteResult<Vec<Pet>> {
        let due: Vec<Pet> = self
            .list_pets_by_status(PetStatus::Found)?
            .into_iter()
            .filter(|pet| pet.should_move_to_adoption(now))
            .collect();

        if due.is_empty() {
            return Ok(due);
        }

        let conn = self.conn();
        for pet in &due {
            conn.execute(
                "UPDATE pets SET status = ?1 WHERE id = ?2",
                rusqlite::params![PetStatus::ForAdoption.as_ref(), pet.id],
            )?;
        }

        Ok(due)
    }

    pub fn count_pets(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM pets", [], |row| row.get(0))
    }

    pub fn count_pets_by_status(&self, status: PetStatus) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM pets WHERE status = ?1",
            [status.as_ref()],
            |row| row.get(0),
        )
    }

    /// Users owning at least one pet
    pub fn count_active_owners(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(DISTINCT owner_id) FROM pets WHERE owner_id IS NOT NULL",
            [],
            |row| row.get(0),
        )
    }
}
