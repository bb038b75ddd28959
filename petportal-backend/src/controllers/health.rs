use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
}

/// Liveness plus reachability of both databases
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let main_ok = state.db.table_counts().iter().all(|t| t.error.is_none());
    let chat_ok = state.chat_db.table_counts().iter().all(|t| t.error.is_none());
    let status = if main_ok && chat_ok { "ok" } else { "degraded" };

    HttpResponse::Ok().json(serde_json::json!({
        "status": status,
        "version": VERSION,
        "databases": {
            "default": main_ok,
            "chat_db": chat_ok,
        }
    }))
}

async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}
