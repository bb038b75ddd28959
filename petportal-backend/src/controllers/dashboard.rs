use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Serialize;

use super::internal_error;
use super::pets::listings;
use crate::middleware::session_auth::authenticate;
use crate::models::{AdoptionRequestDetail, PetListing, ReviewStatus};
use crate::AppState;

#[derive(Serialize)]
pub struct DashboardData {
    user_pets: Vec<PetListing>,
    sent_requests: Vec<AdoptionRequestDetail>,
    received_requests: Vec<AdoptionRequestDetail>,
    approved_requests: Vec<AdoptionRequestDetail>,
    unread_notifications: i64,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/dashboard").route(web::get().to(get_dashboard)));
}

async fn get_dashboard(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let db = &state.db;
    let data = (|| -> rusqlite::Result<DashboardData> {
        let received_requests = db.list_received_adoption_requests(user.id, None)?;
        let approved_requests = received_requests
            .iter()
            .filter(|r| r.request.status == ReviewStatus::Approved)
            .cloned()
            .collect();

        Ok(DashboardData {
            user_pets: listings(db, db.list_pets_by_owner(user.id)?)?,
            sent_requests: db.list_sent_adoption_requests(user.id)?,
            received_requests,
            approved_requests,
            unread_notifications: db.count_unread_notifications(user.id)?,
        })
    })();

    match data {
        Ok(data) => HttpResponse::Ok().json(data),
        Err(e) => internal_error("Failed to load dashboard", e),
    }
}
