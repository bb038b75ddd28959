use chrono::Utc;

use super::CommandResult;
use crate::db::Database;
use crate::models::Pet;

/// Move found pets past the waiting period into adoption and report each one
pub fn run(db: &Database) -> CommandResult<Vec<Pet>> {
    let moved = db.move_found_pets_to_adoption(Utc::now())?;

    for pet in &moved {
        println!("Moved {} (id {}) to adoption", pet.name, pet.id);
    }
    println!("Moved {} found pet(s) to adoption", moved.len());
    log::info!("move-found-pets: {} pet(s) moved", moved.len());

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPet, PetStatus, Species};
    use chrono::Duration;

    #[test]
    fn test_moves_only_overdue_found_pets() {
        let db = Database::new(":memory:").unwrap();
        let found = |name: &str, days_ago: i64| {
            db.create_pet(&NewPet {
                name: name.to_string(),
                species: Species::Cat,
                status: PetStatus::Found,
                location: "Street".to_string(),
                found_date: Some(Utc::now() - Duration::days(days_ago)),
                ..NewPet::default()
            })
            .unwrap()
        };
        let old = found("Old", 16);
        let fresh = found("Fresh", 2);

        let moved = run(&db).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, old.id);
        assert_eq!(db.get_pet(old.id).unwrap().unwrap().status, PetStatus::ForAdoption);
        assert_eq!(db.get_pet(fresh.id).unwrap().unwrap().status, PetStatus::Found);
    }
}
