pub mod admin;
pub mod adoption;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod pets;
pub mod registrations;

use actix_web::HttpResponse;

/// Log a storage failure and answer with a generic 500
pub(crate) fn internal_error(context: &str, e: impl std::fmt::Display) -> HttpResponse {
    log::error!("{}: {}", context, e);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Database error"
    }))
}

pub(crate) fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": message }))
}

pub(crate) fn bad_request(message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.to_string() }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::chat::ChatService;
    use crate::config::Config;
    use crate::db::test_support::memory_databases;
    use crate::models::User;
    use crate::AppState;
    use chrono::Duration;
    use std::sync::Arc;

    pub fn app_state() -> AppState {
        let (db, chat_db) = memory_databases();
        AppState {
            chat: Arc::new(ChatService::new(db.clone(), chat_db.clone())),
            db,
            chat_db,
            config: Config::default(),
        }
    }

    /// Open a session for `user` and return the Authorization header value
    pub fn login(state: &AppState, user: &User) -> String {
        let token = format!("token-{}", user.username);
        state
            .db
            .create_session(user.id, &token, Duration::hours(1))
            .expect("create session");
        format!("Bearer {}", token)
    }
}
