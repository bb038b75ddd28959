use chrono::{Duration, Utc};

use super::{CommandError, CommandResult};
use crate::db::Database;
use crate::models::{NewPet, PetGender, PetStatus, ProfileGender, Species, User};
use crate::security::hash_password;

const SAMPLE_PASSWORD: &str = "petportal123";

struct SamplePet {
    name: &'static str,
    species: Species,
    breed: &'static str,
    gender: PetGender,
    status: PetStatus,
    location: &'static str,
    found_days_ago: Option<i64>,
}

const SAMPLE_PETS: &[(&str, SamplePet)] = &[
    (
        "alice",
        SamplePet {
            name: "Buddy",
            species: Species::Dog,
            breed: "Labrador",
            gender: PetGender::Male,
            status: PetStatus::ForAdoption,
            location: "Downtown",
            found_days_ago: None,
        },
    ),
    (
        "alice",
        SamplePet {
            name: "Whiskers",
            species: Species::Cat,
            breed: "Tabby",
            gender: PetGender::Female,
            status: PetStatus::Lost,
            location: "Riverside Park",
            found_days_ago: None,
        },
    ),
    (
        "bob",
        SamplePet {
            name: "Hopper",
            species: Species::Rabbit,
            breed: "Lop",
            gender: PetGender::Unknown,
            status: PetStatus::Found,
            location: "Market Street",
            found_days_ago: Some(3),
        },
    ),
];

/// Outcome of a seed run
#[derive(Debug, Default)]
pub struct SeedReport {
    pub created_users: Vec<String>,
    pub existing_users: Vec<String>,
    pub created_pets: usize,
}

fn ensure_user(
    db: &Database,
    report: &mut SeedReport,
    username: &str,
    password: &str,
    admin: bool,
) -> CommandResult<(User, bool)> {
    if let Some(existing) = db.get_user_by_username(username)? {
        report.existing_users.push(username.to_string());
        return Ok((existing, false));
    }

    let hash = hash_password(password).map_err(|e| CommandError::Password(e.to_string()))?;
    let user = db.create_user(username, &format!("{}@petportal.local", username), &hash, admin, admin)?;
    db.create_user_profile(user.id, Some(30), None, Some(ProfileGender::Other), Some("Springfield"))?;
    if admin {
        db.create_admin_profile(user.id, false)?;
    }
    report.created_users.push(username.to_string());
    Ok((user, true))
}

/// Create sample users, an admin and pets. Users that already exist are left
/// alone, and pets are only added for owners created in this run.
pub fn run(db: &Database, admin_password: &str) -> CommandResult<SeedReport> {
    let mut report = SeedReport::default();
    ensure_user(db, &mut report, "admin", admin_password, true)?;

    let now = Utc::now();
    for owner_name in ["alice", "bob"] {
        let (owner, created) = ensure_user(db, &mut report, owner_name, SAMPLE_PASSWORD, false)?;
        if !created {
            continue;
        }

        for (_, sample) in SAMPLE_PETS.iter().filter(|(name, _)| *name == owner_name) {
            db.create_pet(&NewPet {
                name: sample.name.to_string(),
                species: sample.species,
                breed: Some(sample.breed.to_string()),
                gender: sample.gender,
                status: sample.status,
                location: sample.location.to_string(),
                contact_email: Some(owner.email.clone()),
                owner_id: Some(owner.id),
                found_date: sample.found_days_ago.map(|days| now - Duration::days(days)),
                ..NewPet::default()
            })?;
            report.created_pets += 1;
        }
    }

    println!(
        "Seeded {} user(s) and {} pet(s); {} user(s) already present",
        report.created_users.len(),
        report.created_pets,
        report.existing_users.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::new(":memory:").unwrap();

        let first = run(&db, "admin-secret").unwrap();
        assert_eq!(first.created_users, vec!["admin", "alice", "bob"]);
        assert_eq!(first.created_pets, SAMPLE_PETS.len());

        let admin = db.get_user_by_username("admin").unwrap().unwrap();
        assert!(db.is_admin(&admin).unwrap());
        assert!(db.has_admin_profile(admin.id).unwrap());

        let second = run(&db, "admin-secret").unwrap();
        assert!(second.created_users.is_empty());
        assert_eq!(second.existing_users.len(), 3);
        assert_eq!(db.count_pets().unwrap(), SAMPLE_PETS.len() as i64);
    }

    #[test]
    fn test_seeded_found_pet_has_found_date() {
        let db = Database::new(":memory:").unwrap();
        run(&db, "admin-secret").unwrap();

        let found = db.list_pets_by_status(PetStatus::Found).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].found_date.is_some());
        assert!(!found[0].should_move_to_adoption(Utc::now()));
    }
}
