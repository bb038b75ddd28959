use actix_web::{web, HttpRequest, HttpResponse, Responder};

use super::{internal_error, not_found};
use crate::middleware::session_auth::authenticate;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications")
            .route("", web::get().to(list_notifications))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}

async fn list_notifications(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let result = state
        .db
        .list_notifications(user.id)
        .and_then(|list| Ok((list, state.db.count_unread_notifications(user.id)?)));

    match result {
        Ok((notifications, unread)) => HttpResponse::Ok().json(serde_json::json!({
            "notifications": notifications,
            "unread_count": unread,
        })),
        Err(e) => internal_error("Failed to list notifications", e),
    }
}

async fn mark_read(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.db.mark_notification_read(path.into_inner(), user.id) {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Ok(false) => not_found("Notification not found"),
        Err(e) => internal_error("Failed to mark notification read", e),
    }
}
