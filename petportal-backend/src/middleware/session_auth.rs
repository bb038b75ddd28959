// Session authentication helpers
// Handlers call `authenticate` or `require_admin` at the top and return the
// error response as-is when it fails.

use actix_web::{HttpRequest, HttpResponse};

use crate::db::Database;
use crate::models::User;

pub fn extract_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").trim().to_string())
        .filter(|s| !s.is_empty())
}

fn internal_error(e: rusqlite::Error) -> HttpResponse {
    log::error!("Session validation error: {}", e);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Internal server error"
    }))
}

/// Resolve the bearer token to its user
pub fn authenticate(db: &Database, req: &HttpRequest) -> Result<User, HttpResponse> {
    let token = extract_token(req).ok_or_else(|| {
        HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "No authorization token provided"
        }))
    })?;

    let session = match db.validate_session(&token) {
        Ok(Some(session)) => session,
        Ok(None) => {
            return Err(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Invalid or expired session"
            })))
        }
        Err(e) => return Err(internal_error(e)),
    };

    match db.get_user(session.user_id) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Invalid or expired session"
        }))),
        Err(e) => Err(internal_error(e)),
    }
}

/// Like `authenticate`, but the user must also be an admin
pub fn require_admin(db: &Database, req: &HttpRequest) -> Result<User, HttpResponse> {
    let user = authenticate(db, req)?;
    match db.is_admin(&user) {
        Ok(true) => Ok(user),
        Ok(false) => Err(HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Admin access required"
        }))),
        Err(e) => Err(internal_error(e)),
    }
}
