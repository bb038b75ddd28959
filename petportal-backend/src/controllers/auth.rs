use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Duration;
use serde::Serialize;

use super::{bad_request, internal_error, not_found};
use crate::middleware::session_auth::{authenticate, extract_token};
use crate::models::{
    AdminRegisterRequest, LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest,
    RegisterRequest, User, UserProfile, MAX_ADMIN_PROFILES,
};
use crate::security;
use crate::validation;
use crate::AppState;

const RESET_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl LoginResponse {
    fn failure(error: &str) -> Self {
        Self {
            success: false,
            token: None,
            expires_at: None,
            user: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ValidateResponse {
    valid: bool,
}

#[derive(Serialize)]
struct MeResponse {
    user: User,
    profile: Option<UserProfile>,
    is_admin: bool,
    unread_notifications: i64,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/admin_register", web::post().to(admin_register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/validate", web::get().to(validate))
            .route("/me", web::get().to(me))
            .route("/password_reset", web::post().to(password_reset))
            .route("/password_reset/confirm", web::post().to(password_reset_confirm)),
    );
}

/// Check the username is free, then hash the password
fn prepare_account(state: &AppState, username: &str, password: &str) -> Result<String, HttpResponse> {
    match state.db.get_user_by_username(username) {
        Ok(Some(_)) => return Err(bad_request("A user with that username already exists.")),
        Ok(None) => {}
        Err(e) => return Err(internal_error("Failed to look up username", e)),
    }

    security::hash_password(password).map_err(|e| internal_error("Failed to hash password", e))
}

async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> impl Responder {
    let form = body.into_inner();
    if let Err(e) = validation::validate_registration(&form) {
        return bad_request(e);
    }

    let password_hash = match prepare_account(&state, form.username.trim(), &form.password1) {
        Ok(hash) => hash,
        Err(resp) => return resp,
    };

    let user = match state
        .db
        .create_user(form.username.trim(), form.email.trim(), &password_hash, false, false)
    {
        Ok(user) => user,
        Err(e) => return internal_error("Failed to create user", e),
    };

    let profile = match state.db.create_user_profile(
        user.id,
        Some(form.age),
        Some(form.phone_number.trim()),
        Some(form.gender),
        Some(form.location.trim()),
    ) {
        Ok(profile) => profile,
        Err(e) => return internal_error("Failed to create profile", e),
    };

    log::info!("Registered user {}", user.username);
    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Registration successful. Please log in.",
        "user": user,
        "profile": profile,
    }))
}

async fn admin_register(
    state: web::Data<AppState>,
    body: web::Json<AdminRegisterRequest>,
) -> impl Responder {
    let form = body.into_inner();
    if let Err(e) = validation::validate_admin_registration(&form) {
        return bad_request(e);
    }
    if form.admin_code != state.config.admin_registration_code {
        return bad_request("Invalid admin registration code.");
    }

    match state.db.count_admin_profiles() {
        Ok(count) if count >= MAX_ADMIN_PROFILES => {
            return bad_request(format!(
                "Maximum number of admin accounts ({}) already created.",
                MAX_ADMIN_PROFILES
            ));
        }
        Ok(_) => {}
        Err(e) => return internal_error("Failed to count admin profiles", e),
    }

    let password_hash = match prepare_account(&state, form.username.trim(), &form.password1) {
        Ok(hash) => hash,
        Err(resp) => return resp,
    };

    let user = match state
        .db
        .create_user(form.username.trim(), form.email.trim(), &password_hash, true, true)
    {
        Ok(user) => user,
        Err(e) => return internal_error("Failed to create admin user", e),
    };

    if let Err(e) = state.db.create_admin_profile(user.id, false) {
        return internal_error("Failed to create admin profile", e);
    }

    log::info!("Registered admin {}", user.username);
    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Admin account created successfully. Please log in.",
        "user": user,
    }))
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    let user = match state.db.get_user_by_username(body.username.trim()) {
        Ok(Some(user)) if security::verify_password(&body.password, &user.password_hash) => user,
        Ok(_) => {
            return HttpResponse::Unauthorized()
                .json(LoginResponse::failure("Invalid username or password."));
        }
        Err(e) => {
            log::error!("Failed to look up user: {}", e);
            return HttpResponse::InternalServerError().json(LoginResponse::failure("Database error"));
        }
    };

    let token = security::generate_session_token();
    let ttl = Duration::hours(state.config.session_ttl_hours);
    match state.db.create_session(user.id, &token, ttl) {
        Ok(session) => HttpResponse::Ok().json(LoginResponse {
            success: true,
            token: Some(session.token),
            expires_at: Some(session.expires_at.timestamp()),
            user: Some(user),
            error: None,
        }),
        Err(e) => {
            log::error!("Failed to create session: {}", e);
            HttpResponse::InternalServerError().json(LoginResponse::failure("Failed to create session"))
        }
    }
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(token) = extract_token(&req) else {
        return HttpResponse::Ok().json(serde_json::json!({ "success": true }));
    };

    match state.db.delete_session(&token) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            log::error!("Failed to delete session: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "success": false }))
        }
    }
}

async fn validate(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(token) = extract_token(&req) else {
        return HttpResponse::Ok().json(ValidateResponse { valid: false });
    };

    match state.db.validate_session(&token) {
        Ok(Some(_)) => HttpResponse::Ok().json(ValidateResponse { valid: true }),
        Ok(None) => HttpResponse::Ok().json(ValidateResponse { valid: false }),
        Err(e) => {
            log::error!("Failed to validate session: {}", e);
            HttpResponse::Ok().json(ValidateResponse { valid: false })
        }
    }
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let lookup = (|| -> rusqlite::Result<_> {
        let profile = state.db.get_user_profile(user.id)?;
        let is_admin = state.db.is_admin(&user)?;
        let unread = state.db.count_unread_notifications(user.id)?;
        Ok((profile, is_admin, unread))
    })();

    match lookup {
        Ok((profile, is_admin, unread_notifications)) => HttpResponse::Ok().json(MeResponse {
            user,
            profile,
            is_admin,
            unread_notifications,
        }),
        Err(e) => internal_error("Failed to load account", e),
    }
}

/// Issue a reset token. Without e-mail delivery the link is returned and logged.
async fn password_reset(
    state: web::Data<AppState>,
    body: web::Json<PasswordResetRequest>,
) -> impl Responder {
    if let Err(e) = validation::validate_email(&body.email) {
        return bad_request(e);
    }

    let user = match state.db.get_user_by_email(body.email.trim()) {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("No user found with this email address."),
        Err(e) => return internal_error("Failed to look up email", e),
    };

    let token = security::generate_reset_token();
    let expires_at = match state.db.create_password_reset_token(
        user.id,
        &token,
        Duration::hours(RESET_TOKEN_TTL_HOURS),
    ) {
        Ok(expires_at) => expires_at,
        Err(e) => return internal_error("Failed to create reset token", e),
    };

    let reset_link = format!("{}/password-reset-confirm/{}/", state.config.public_base_url, token);
    log::info!("Password reset link for {} (email not configured): {}", user.username, reset_link);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Password reset link (email not configured): {}", reset_link),
        "reset_link": reset_link,
        "token": token,
        "expires_at": expires_at.timestamp(),
    }))
}

async fn password_reset_confirm(
    state: web::Data<AppState>,
    body: web::Json<PasswordResetConfirmRequest>,
) -> impl Responder {
    if let Err(e) = validation::validate_new_password(&body.new_password1, &body.new_password2) {
        return bad_request(e);
    }

    let user_id = match state.db.consume_password_reset_token(body.token.trim()) {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return bad_request("The password reset link is invalid or has expired."),
        Err(e) => return internal_error("Failed to check reset token", e),
    };

    let password_hash = match security::hash_password(&body.new_password1) {
        Ok(hash) => hash,
        Err(e) => return internal_error("Failed to hash password", e),
    };

    if let Err(e) = state.db.update_password(user_id, &password_hash) {
        return internal_error("Failed to update password", e);
    }
    if let Err(e) = state.db.delete_sessions_for_user(user_id) {
        return internal_error("Failed to clear sessions", e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Your password has been reset successfully!"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ADMIN_REGISTRATION_CODE;
    use crate::controllers::test_support::app_state;
    use actix_web::{http::StatusCode, test, App};

    fn admin_form(username: &str, code: &str) -> serde_json::Value {
        serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password1": "s3cret-pass",
            "password2": "s3cret-pass",
            "admin_code": code,
        })
    }

    #[actix_web::test]
    async fn test_admin_registration_limits() {
        let state = web::Data::new(app_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/admin_register")
            .set_json(admin_form("intruder", "WRONG"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        for name in ["admin1", "admin2", "admin3"] {
            let req = test::TestRequest::post()
                .uri("/api/auth/admin_register")
                .set_json(admin_form(name, DEFAULT_ADMIN_REGISTRATION_CODE))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        // a fourth admin is refused
        let req = test::TestRequest::post()
            .uri("/api/auth/admin_register")
            .set_json(admin_form("admin4", DEFAULT_ADMIN_REGISTRATION_CODE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.db.count_admin_profiles().unwrap(), MAX_ADMIN_PROFILES);
        let admin = state.db.get_user_by_username("admin1").unwrap().unwrap();
        assert!(admin.is_staff && admin.is_superuser);
        assert!(state.db.get_user_by_username("admin4").unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_register_login_and_me() {
        let state = web::Data::new(app_state());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password1": "s3cret-pass",
                "password2": "s3cret-pass",
                "age": 30,
                "phone_number": "5551234",
                "gender": "female",
                "location": "Springfield",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "username": "alice", "password": "wrong-pass" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "username": "alice", "password": "s3cret-pass" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert!(body["user"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["profile"]["location"], "Springfield");
        assert_eq!(body["is_admin"], false);

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        test::call_service(&app, req).await;
        assert!(state.db.validate_session(&token).unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_password_reset_flow() {
        let state = web::Data::new(app_state());
        let hash = security::hash_password("old-password").unwrap();
        let user = state
            .db
            .create_user("bob", "Bob@Example.com", &hash, false, false)
            .unwrap();
        state
            .db
            .create_session(user.id, "old-session", Duration::hours(1))
            .unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/password_reset")
            .set_json(serde_json::json!({ "email": "nobody@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/auth/password_reset")
            .set_json(serde_json::json!({ "email": "bob@example.com" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let token = body["token"].as_str().unwrap().to_string();
        assert!(body["reset_link"].as_str().unwrap().ends_with(&format!("{}/", token)));

        let confirm = serde_json::json!({
            "token": token,
            "new_password1": "new-password",
            "new_password2": "new-password",
        });
        let req = test::TestRequest::post()
            .uri("/api/auth/password_reset/confirm")
            .set_json(&confirm)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let updated = state.db.get_user(user.id).unwrap().unwrap();
        assert!(security::verify_password("new-password", &updated.password_hash));
        assert!(state.db.validate_session("old-session").unwrap().is_none());

        // tokens are single use
        let req = test::TestRequest::post()
            .uri("/api/auth/password_reset/confirm")
            .set_json(&confirm)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
