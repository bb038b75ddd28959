use actix_web::{web, HttpRequest, HttpResponse, Responder};

use super::{bad_request, internal_error};
use crate::middleware::session_auth::authenticate;
use crate::models::NewRegistrationRequest;
use crate::validation;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/registrations")
            .route(web::get().to(my_registrations))
            .route(web::post().to(submit_registration)),
    );
}

async fn submit_registration(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewRegistrationRequest>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let form = body.into_inner();
    if let Err(e) = validation::validate_registration_request(&form) {
        return bad_request(e);
    }

    match state.db.create_registration_request(user.id, &form) {
        Ok(registration) => {
            log::info!("User {} submitted registration for {}", user.username, registration.name);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "Your pet registration request has been submitted! An admin will review it shortly.",
                "registration": registration,
            }))
        }
        Err(e) => internal_error("Failed to create registration request", e),
    }
}

async fn my_registrations(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.db.list_registration_requests_for_user(user.id) {
        Ok(registrations) => HttpResponse::Ok().json(serde_json::json!({
            "registrations": registrations,
        })),
        Err(e) => internal_error("Failed to list registration requests", e),
    }
}
