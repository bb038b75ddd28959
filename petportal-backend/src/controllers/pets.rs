use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use std::collections::BTreeSet;

use super::{bad_request, internal_error, not_found};
use crate::db::Database;
use crate::middleware::session_auth::authenticate;
use crate::models::{Pet, PetInput, PetListing, PetStatus};
use crate::validation;
use crate::AppState;

const SIMILAR_PETS_LIMIT: i64 = 3;

pub fn config(cfg: &mut web::ServiceConfig) {
    // plain resources rather than a scope so /api/pets/{id}/adoption_requests
    // registered by the adoption controller still resolves
    cfg.service(web::resource("/api/pets/adoption").route(web::get().to(adoption_list)));
    cfg.service(web::resource("/api/pets/lost").route(web::get().to(lost_list)));
    cfg.service(web::resource("/api/pets/found").route(web::get().to(found_list)));
    cfg.service(
        web::resource("/api/pets/{id}")
            .route(web::get().to(pet_detail))
            .route(web::put().to(edit_pet)),
    );
}

/// Wrap pets for display, resolving owner usernames in one query
pub(crate) fn listings(db: &Database, pets: Vec<Pet>) -> rusqlite::Result<Vec<PetListing>> {
    let owner_ids: Vec<i64> = pets
        .iter()
        .filter_map(|p| p.owner_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let names = db.usernames_by_ids(&owner_ids)?;
    let now = Utc::now();

    Ok(pets
        .into_iter()
        .map(|pet| {
            let owner = pet.owner_id.and_then(|id| names.get(&id).cloned());
            PetListing::new(pet, now).with_owner(owner)
        })
        .collect())
}

fn status_list(db: &Database, status: PetStatus) -> HttpResponse {
    match db
        .list_pets_by_status(status)
        .and_then(|pets| listings(db, pets))
    {
        Ok(pets) => HttpResponse::Ok().json(serde_json::json!({
            "page_title": page_title(status),
            "pets": pets,
        })),
        Err(e) => internal_error("Failed to list pets", e),
    }
}

fn page_title(status: PetStatus) -> &'static str {
    match status {
        PetStatus::ForAdoption => "Pets Available for Adoption",
        PetStatus::Lost => "Lost Pets",
        PetStatus::Found => "Found Pets",
        PetStatus::Adopted => "Adopted Pets",
    }
}

async fn adoption_list(state: web::Data<AppState>) -> impl Responder {
    let moved = match state.db.move_found_pets_to_adoption(Utc::now()) {
        Ok(moved) => moved.len(),
        Err(e) => return internal_error("Failed to move found pets", e),
    };
    if moved > 0 {
        log::info!("{} found pet(s) moved to adoption after the waiting period", moved);
    }

    match state
        .db
        .list_pets_by_status(PetStatus::ForAdoption)
        .and_then(|pets| listings(&state.db, pets))
    {
        Ok(pets) => HttpResponse::Ok().json(serde_json::json!({
            "page_title": page_title(PetStatus::ForAdoption),
            "moved": moved,
            "pets": pets,
        })),
        Err(e) => internal_error("Failed to list pets", e),
    }
}

async fn lost_list(state: web::Data<AppState>) -> impl Responder {
    status_list(&state.db, PetStatus::Lost)
}

async fn found_list(state: web::Data<AppState>) -> impl Responder {
    status_list(&state.db, PetStatus::Found)
}

async fn pet_detail(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let pet = match state.db.get_pet(path.into_inner()) {
        Ok(Some(pet)) => pet,
        Ok(None) => return not_found("Pet not found"),
        Err(e) => return internal_error("Failed to load pet", e),
    };

    let similar = match state
        .db
        .list_similar_pets(&pet, SIMILAR_PETS_LIMIT)
        .and_then(|pets| listings(&state.db, pets))
    {
        Ok(similar) => similar,
        Err(e) => return internal_error("Failed to load similar pets", e),
    };

    match listings(&state.db, vec![pet]) {
        Ok(mut listing) => HttpResponse::Ok().json(serde_json::json!({
            "pet": listing.pop(),
            "similar_pets": similar,
        })),
        Err(e) => internal_error("Failed to load pet owner", e),
    }
}

async fn edit_pet(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<PetInput>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let pet = match state.db.get_pet(path.into_inner()) {
        Ok(Some(pet)) => pet,
        Ok(None) => return not_found("Pet not found"),
        Err(e) => return internal_error("Failed to load pet", e),
    };

    let allowed = pet.owner_id == Some(user.id)
        || match state.db.is_admin(&user) {
            Ok(is_admin) => is_admin,
            Err(e) => return internal_error("Failed to check admin rights", e),
        };
    if !allowed {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "You do not have permission to edit this pet."
        }));
    }

    let input = body.into_inner();
    if let Err(e) = validation::validate_pet_input(&input) {
        return bad_request(e);
    }

    let found_date = match (input.status, pet.found_date) {
        (PetStatus::Found, None) => Some(Utc::now()),
        (_, existing) => existing,
    };

    if let Err(e) = state.db.update_pet(pet.id, &input, found_date) {
        return internal_error("Failed to update pet", e);
    }

    match state.db.get_pet(pet.id) {
        Ok(Some(updated)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Pet updated successfully!",
            "pet": updated,
        })),
        Ok(None) => not_found("Pet not found"),
        Err(e) => internal_error("Failed to reload pet", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{app_state, login};
    use crate::db::test_support::{admin, pet, user};
    use crate::models::{NewPet, Species};
    use actix_web::{http::StatusCode, test, App};
    use chrono::Duration;

    fn edit_body(status: &str) -> serde_json::Value {
        serde_json::json!({
            "name": "Rex",
            "species": "dog",
            "status": status,
            "location": "North Park",
            "contact_email": "owner@example.com",
            "contact_phone": "5551234",
        })
    }

    #[actix_web::test]
    async fn test_edit_pet_requires_owner_or_admin() {
        let state = web::Data::new(app_state());
        let owner = user(&state.db, "owner");
        let mallory = user(&state.db, "mallory");
        let boss = admin(&state.db, "boss");
        let rex = pet(&state.db, "Rex", Some(&owner));
        let owner_auth = login(&state, &owner);
        let mallory_auth = login(&state, &mallory);
        let boss_auth = login(&state, &boss);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let uri = format!("/api/pets/{}", rex.id);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(("Authorization", mallory_auth))
            .set_json(edit_body("for_adoption"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(("Authorization", boss_auth))
            .set_json(edit_body("for_adoption"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // moving into found stamps the found date
        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(("Authorization", owner_auth))
            .set_json(edit_body("found"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let updated = state.db.get_pet(rex.id).unwrap().unwrap();
        assert_eq!(updated.status, PetStatus::Found);
        assert_eq!(updated.location, "North Park");
        assert!(updated.found_date.is_some());
    }

    #[actix_web::test]
    async fn test_adoption_list_moves_overdue_found_pets() {
        let state = web::Data::new(app_state());
        let owner = user(&state.db, "owner");
        pet(&state.db, "Rex", Some(&owner));
        let stray = state
            .db
            .create_pet(&NewPet {
                name: "Stray".to_string(),
                species: Species::Cat,
                status: PetStatus::Found,
                location: "Alley".to_string(),
                found_date: Some(Utc::now() - Duration::days(20)),
                ..NewPet::default()
            })
            .unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/pets/adoption").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["moved"], 1);
        let names: Vec<&str> = body["pets"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert!(names.contains(&"Stray"));
        assert!(names.contains(&"Rex"));
        assert_eq!(
            state.db.get_pet(stray.id).unwrap().unwrap().status,
            PetStatus::ForAdoption
        );

        // nothing left to move on the next visit
        let req = test::TestRequest::get().uri("/api/pets/adoption").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["moved"], 0);
    }
}
