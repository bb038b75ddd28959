use actix_web::{web, HttpRequest, HttpResponse, Responder};

use super::{bad_request, internal_error, not_found};
use crate::middleware::session_auth::authenticate;
use crate::models::{AdoptionAction, CreateAdoptionRequest, ReviewStatus};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/pets/{id}/adoption_requests").route(web::post().to(request_adoption)),
    );
    cfg.service(
        web::resource("/api/adoption_requests/{id}/{action}").route(web::post().to(manage_request)),
    );
}

async fn request_adoption(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<CreateAdoptionRequest>>,
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

    if pet.owner_id == Some(user.id) {
        return bad_request("You are the owner of this pet.");
    }

    let message = body
        .and_then(|b| b.into_inner().message)
        .map(|m| m.trim().to_string());

    match state
        .db
        .create_adoption_request(pet.id, user.id, message.as_deref())
    {
        Ok(Some(request)) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Adoption request submitted!",
            "request": request,
        })),
        Ok(None) => bad_request("You have already requested adoption for this pet."),
        Err(e) => internal_error("Failed to create adoption request", e),
    }
}

/// Owner approves or rejects a request for one of their pets
async fn manage_request(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, String)>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let (request_id, action) = path.into_inner();

    let request = match state.db.get_adoption_request(request_id) {
        Ok(Some(request)) => request,
        Ok(None) => return not_found("Adoption request not found"),
        Err(e) => return internal_error("Failed to load adoption request", e),
    };

    // requests for pets the user does not own look the same as missing ones
    match state.db.get_pet(request.pet_id) {
        Ok(Some(pet)) if pet.owner_id == Some(user.id) => {}
        Ok(_) => return not_found("Adoption request not found"),
        Err(e) => return internal_error("Failed to load pet", e),
    }

    let (status, message) = match action.parse::<AdoptionAction>() {
        Ok(AdoptionAction::Approve) => (ReviewStatus::Approved, "Adoption request approved!"),
        Ok(AdoptionAction::Reject) => (ReviewStatus::Rejected, "Adoption request rejected."),
        Err(_) => return bad_request(format!("Unknown action: {}", action)),
    };

    match state.db.review_adoption_request(request.id, status) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": message,
            "status": status,
        })),
        Err(e) => internal_error("Failed to update adoption request", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{app_state, login};
    use crate::db::test_support::{pet, user};
    use crate::models::PetStatus;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_request_adoption_rules() {
        let state = web::Data::new(app_state());
        let owner = user(&state.db, "owner");
        let alice = user(&state.db, "alice");
        let rex = pet(&state.db, "Rex", Some(&owner));
        let owner_auth = login(&state, &owner);
        let alice_auth = login(&state, &alice);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let uri = format!("/api/pets/{}/adoption_requests", rex.id);

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", owner_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", alice_auth.clone()))
            .set_json(serde_json::json!({ "message": " I have a garden " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["request"]["message"], "I have a garden");

        // second request while the first is pending
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("Authorization", alice_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.db.count_pending_adoption_requests().unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_manage_request_is_owner_only() {
        let state = web::Data::new(app_state());
        let owner = user(&state.db, "owner");
        let alice = user(&state.db, "alice");
        let rex = pet(&state.db, "Rex", Some(&owner));
        let request = state
            .db
            .create_adoption_request(rex.id, alice.id, None)
            .unwrap()
            .unwrap();
        let owner_auth = login(&state, &owner);
        let alice_auth = login(&state, &alice);
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/adoption_requests/{}/approve", request.id))
            .insert_header(("Authorization", alice_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/adoption_requests/{}/adopt", request.id))
            .insert_header(("Authorization", owner_auth.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&format!("/api/adoption_requests/{}/approve", request.id))
            .insert_header(("Authorization", owner_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state.db.get_adoption_request(request.id).unwrap().unwrap();
        assert_eq!(stored.status, ReviewStatus::Approved);
        assert_eq!(state.db.get_pet(rex.id).unwrap().unwrap().status, PetStatus::Adopted);
    }
}
