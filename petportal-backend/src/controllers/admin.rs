use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::pets::listings;
use super::{internal_error, not_found};
use crate::middleware::session_auth::require_admin;
use crate::models::PetStatus;
use crate::AppState;

const RECENT_PETS_LIMIT: i64 = 10;
const RECENT_REGISTRATIONS_LIMIT: i64 = 50;
const RECENT_SIGNUP_DAYS: i64 = 30;

#[derive(Deserialize, Default)]
pub struct ReviewRequest {
    #[serde(default)]
    admin_notes: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .route("/dashboard", web::get().to(dashboard))
            .route("/pets", web::get().to(all_pets))
            .route("/pets/{id}/status", web::post().to(toggle_pet_status))
            .route("/users", web::get().to(users))
            .route("/registrations", web::get().to(registrations))
            .route("/registrations/{id}/approve", web::post().to(approve_registration))
            .route("/registrations/{id}/reject", web::post().to(reject_registration))
            .route("/run_auto_move", web::post().to(run_auto_move))
            .route("/chat/start/{user_id}", web::post().to(super::chat::admin_start_chat)),
    );
}

async fn dashboard(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_admin(&state.db, &req) {
        return resp;
    }

    let db = &state.db;
    let stats = (|| -> rusqlite::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "total_pets": db.count_pets()?,
            "adoption_pets": db.count_pets_by_status(PetStatus::ForAdoption)?,
            "lost_pets": db.count_pets_by_status(PetStatus::Lost)?,
            "found_pets": db.count_pets_by_status(PetStatus::Found)?,
            "total_users": db.count_users()?,
            "pending_requests": db.count_pending_adoption_requests()?,
            "pending_registration_requests": db.count_pending_registration_requests()?,
            "recent_pets": listings(db, db.list_recent_pets(RECENT_PETS_LIMIT)?)?,
        }))
    })();

    match stats {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => internal_error("Failed to load admin dashboard", e),
    }
}

async fn all_pets(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_admin(&state.db, &req) {
        return resp;
    }

    match state
        .db
        .list_all_pets()
        .and_then(|pets| listings(&state.db, pets))
    {
        Ok(pets) => HttpResponse::Ok().json(serde_json::json!({ "all_pets": pets })),
        Err(e) => internal_error("Failed to list pets", e),
    }
}

async fn users(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_admin(&state.db, &req) {
        return resp;
    }

    let db = &state.db;
    let overview = (|| -> rusqlite::Result<serde_json::Value> {
        let since = Utc::now() - Duration::days(RECENT_SIGNUP_DAYS);
        Ok(serde_json::json!({
            "all_users": db.list_user_overviews()?,
            "admin_count": db.count_admin_profiles()?,
            "active_owners": db.count_active_owners()?,
            "recent_signups": db.count_users_joined_since(since)?,
        }))
    })();

    match overview {
        Ok(overview) => HttpResponse::Ok().json(overview),
        Err(e) => internal_error("Failed to list users", e),
    }
}

async fn toggle_pet_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<StatusRequest>,
) -> impl Responder {
    let admin = match require_admin(&state.db, &req) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };

    let Ok(status) = body.status.parse::<PetStatus>() else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": format!("Invalid status: {}", body.status),
        }));
    };

    let pet_id = path.into_inner();
    let old_status = match state.db.get_pet(pet_id) {
        Ok(Some(pet)) => pet.status,
        Ok(None) => return not_found("Pet not found"),
        Err(e) => return internal_error("Failed to load pet", e),
    };

    match state.db.set_pet_status(pet_id, status) {
        Ok(Some(pet)) => {
            log::info!(
                "Admin {} changed pet {} status from {} to {}",
                admin.username,
                pet.id,
                old_status,
                status
            );
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!(
                    "Pet status updated from {} to {}",
                    old_status.label(),
                    status.label()
                ),
                "pet": pet,
            }))
        }
        Ok(None) => not_found("Pet not found"),
        Err(e) => internal_error("Failed to update pet status", e),
    }
}

async fn registrations(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_admin(&state.db, &req) {
        return resp;
    }

    let result = state.db.list_pending_registration_requests().and_then(|pending| {
        let all = state
            .db
            .list_recent_registration_requests(RECENT_REGISTRATIONS_LIMIT)?;
        Ok((pending, all))
    });

    match result {
        Ok((pending, all)) => HttpResponse::Ok().json(serde_json::json!({
            "pending_requests": pending,
            "all_requests": all,
        })),
        Err(e) => internal_error("Failed to list registration requests", e),
    }
}

async fn approve_registration(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<ReviewRequest>>,
) -> impl Responder {
    let admin = match require_admin(&state.db, &req) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    let notes = body.map(|b| b.into_inner()).unwrap_or_default().admin_notes;

    match state
        .db
        .approve_registration_request(path.into_inner(), admin.id, notes.trim())
    {
        Ok(Some(registration)) => {
            log::info!("Admin {} approved registration {}", admin.username, registration.id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!(
                    "Registration approved! Pet \"{}\" has been created and is now visible to users.",
                    registration.name
                ),
                "registration": registration,
            }))
        }
        Ok(None) => not_found("Pending registration request not found"),
        Err(e) => internal_error("Failed to approve registration", e),
    }
}

async fn reject_registration(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<ReviewRequest>>,
) -> impl Responder {
    let admin = match require_admin(&state.db, &req) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    let notes = body.map(|b| b.into_inner()).unwrap_or_default().admin_notes;

    match state
        .db
        .reject_registration_request(path.into_inner(), admin.id, notes.trim())
    {
        Ok(Some(registration)) => {
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!("Registration for \"{}\" has been rejected.", registration.name),
                "registration": registration,
            }))
        }
        Ok(None) => not_found("Pending registration request not found"),
        Err(e) => internal_error("Failed to reject registration", e),
    }
}

async fn run_auto_move(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_admin(&state.db, &req) {
        return resp;
    }

    match state.db.move_found_pets_to_adoption(Utc::now()) {
        Ok(moved) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "moved": moved.len(),
        })),
        Err(e) => internal_error("Failed to run auto-move", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::registrations;
    use crate::controllers::test_support::{app_state, login};
    use crate::db::test_support::{admin, user};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_non_admin_is_forbidden() {
        let state = app_state();
        let alice = user(&state.db, "alice");
        let alice_auth = login(&state, &alice);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/admin/dashboard")
            .insert_header(("Authorization", alice_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_registration_review_over_http() {
        let state = web::Data::new(app_state());
        let alice = user(&state.db, "alice");
        let boss = admin(&state.db, "boss");
        let alice_auth = login(&state, &alice);
        let boss_auth = login(&state, &boss);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(config)
                .configure(registrations::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/registrations")
            .insert_header(("Authorization", alice_auth))
            .set_json(serde_json::json!({
                "name": "Biscuit",
                "species": "dog",
                "location": "Elm Street",
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let registration_id = body["registration"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri("/api/admin/registrations")
            .insert_header(("Authorization", boss_auth.clone()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pending_requests"].as_array().unwrap().len(), 1);

        let approve = format!("/api/admin/registrations/{}/approve", registration_id);
        let req = test::TestRequest::post()
            .uri(&approve)
            .insert_header(("Authorization", boss_auth.clone()))
            .set_json(serde_json::json!({ "admin_notes": "Looks good" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state.db.get_registration_request(registration_id).unwrap().unwrap();
        let pet = state.db.get_pet(stored.created_pet_id.unwrap()).unwrap().unwrap();
        assert_eq!(pet.owner_id, Some(alice.id));
        assert_eq!(pet.contact_email.as_deref(), Some("alice@example.com"));

        // already reviewed
        let req = test::TestRequest::post()
            .uri(&approve)
            .insert_header(("Authorization", boss_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_status_toggle_and_admin_chat() {
        let state = web::Data::new(app_state());
        let alice = user(&state.db, "alice");
        let boss = admin(&state.db, "boss");
        let boss_auth = login(&state, &boss);
        let rex = crate::db::test_support::pet(&state.db, "Rex", Some(&alice));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/pets/{}/status", rex.id))
            .insert_header(("Authorization", boss_auth.clone()))
            .set_json(serde_json::json!({ "status": "found" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = state.db.get_pet(rex.id).unwrap().unwrap();
        assert_eq!(updated.status, PetStatus::Found);
        assert!(updated.found_date.is_some());

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/pets/{}/status", rex.id))
            .insert_header(("Authorization", boss_auth.clone()))
            .set_json(serde_json::json!({ "status": "sleeping" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let uri = format!("/api/admin/chat/start/{}", alice.id);
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", boss_auth.clone()))
            .to_request();
        let first: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", boss_auth))
            .to_request();
        let second: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first["conversation"]["id"], second["conversation"]["id"]);
        assert_eq!(state.db.count_unread_notifications(alice.id).unwrap(), 1);
    }
}
