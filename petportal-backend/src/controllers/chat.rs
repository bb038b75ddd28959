use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::chat::{ChatError, StartOutcome};
use crate::middleware::session_auth::authenticate;
use crate::AppState;

#[derive(Deserialize)]
pub struct AdminSelection {
    #[serde(default)]
    admin_ids: Vec<i64>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
pub struct FetchQuery {
    #[serde(default)]
    after: i64,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/chat")
            .route("", web::get().to(index))
            .route("/admin", web::get().to(admin_list))
            .route("/start/{pet_id}", web::post().to(start_about_pet))
            .route("/admins", web::get().to(list_admins))
            .route("/admins", web::post().to(start_with_admins))
            .route("/conversations/{id}", web::get().to(view))
            .route("/conversations/{id}", web::post().to(post_message))
            .route("/conversations/{id}/send", web::post().to(send_ajax))
            .route("/conversations/{id}/fetch", web::get().to(fetch))
            .route("/conversations/{id}/leave", web::post().to(leave))
            .route("/conversations/{id}/delete", web::post().to(delete_conversation))
            .route(
                "/conversations/{id}/messages/{msg_id}/delete",
                web::post().to(delete_message),
            ),
    );
}

fn error_response(e: ChatError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        ChatError::NotFound(_) => HttpResponse::NotFound().json(body),
        ChatError::Forbidden(_) => HttpResponse::Forbidden().json(body),
        ChatError::BadRequest(_) => HttpResponse::BadRequest().json(body),
        ChatError::Database(e) => super::internal_error("Chat database error", e),
    }
}

async fn index(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.index(&user) {
        Ok(conversations) => HttpResponse::Ok().json(serde_json::json!({
            "conversations": conversations,
        })),
        Err(e) => error_response(e),
    }
}

async fn admin_list(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.admin_list(&user) {
        Ok(conversations) => HttpResponse::Ok().json(serde_json::json!({
            "conversations": conversations,
        })),
        Err(e) => error_response(e),
    }
}

async fn start_about_pet(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.start_about_pet(&user, path.into_inner()) {
        Ok(StartOutcome::Conversation { conversation, created }) => {
            let body = serde_json::json!({
                "conversation": conversation,
                "created": created,
            });
            if created {
                HttpResponse::Created().json(body)
            } else {
                HttpResponse::Ok().json(body)
            }
        }
        // owners have nobody to talk to; the client goes back to the index
        Ok(StartOutcome::OwnPet) => HttpResponse::Ok().json(serde_json::json!({
            "conversation": null,
            "redirect": "/chat/",
        })),
        Err(e) => error_response(e),
    }
}

async fn list_admins(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.list_admins(&user) {
        Ok(admins) => HttpResponse::Ok().json(serde_json::json!({ "admins": admins })),
        Err(e) => error_response(e),
    }
}

async fn start_with_admins(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<AdminSelection>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.start_with_admins(&user, &body.admin_ids) {
        Ok(conversation) => HttpResponse::Ok().json(serde_json::json!({
            "conversation": conversation,
        })),
        Err(e) => error_response(e),
    }
}

/// Mounted under `/api/admin/chat/start/{user_id}` by the admin controller
pub(crate) async fn admin_start_chat(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let admin = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.admin_start_chat(&admin, path.into_inner()) {
        Ok(conversation) => HttpResponse::Ok().json(serde_json::json!({
            "conversation": conversation,
        })),
        Err(e) => error_response(e),
    }
}

async fn view(state: web::Data<AppState>, req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.view(&user, path.into_inner()) {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(e) => error_response(e),
    }
}

async fn post_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<MessageRequest>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.post_message(&user, path.into_inner(), &body.text) {
        Ok(message) => HttpResponse::Created().json(message),
        Err(e) => error_response(e),
    }
}

async fn send_ajax(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<MessageRequest>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.post_message(&user, path.into_inner(), &body.text) {
        Ok(message) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "id": message.id,
            "text": message.text,
            "sender": message.sender,
            "created_at": message.created_at,
        })),
        Err(ChatError::Database(e)) => super::internal_error("Failed to send message", e),
        Err(e) => {
            let mut builder = match &e {
                ChatError::NotFound(_) => HttpResponse::NotFound(),
                ChatError::Forbidden(_) => HttpResponse::Forbidden(),
                _ => HttpResponse::BadRequest(),
            };
            builder.json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
        }
    }
}

async fn fetch(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<FetchQuery>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.fetch(&user, path.into_inner(), query.after) {
        Ok(messages) => HttpResponse::Ok().json(serde_json::json!({ "messages": messages })),
        Err(e) => error_response(e),
    }
}

async fn leave(state: web::Data<AppState>, req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.leave(&user, path.into_inner()) {
        Ok(deleted) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "conversation_deleted": deleted,
        })),
        Err(e) => error_response(e),
    }
}

async fn delete_conversation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.chat.delete_conversation(&user, path.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

async fn delete_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let user = match authenticate(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let (conversation_id, message_id) = path.into_inner();
    match state.chat.delete_message(&user, conversation_id, message_id) {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Ok(false) => HttpResponse::Ok().json(serde_json::json!({
            "success": false,
            "error": "Message not found",
        })),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{app_state, login};
    use crate::db::test_support::{admin, pet, user};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_chat_flow_over_http() {
        let state = app_state();
        let owner = user(&state.db, "owner");
        let alice = user(&state.db, "alice");
        let rex = pet(&state.db, "Rex", Some(&owner));
        let alice_auth = login(&state, &alice);
        let owner_auth = login(&state, &owner);
        let chat_db = state.chat_db.clone();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        // first start creates the conversation
        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/start/{}", rex.id))
            .insert_header(("Authorization", alice_auth.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let conversation_id = body["conversation"]["id"].as_i64().unwrap();
        assert!(body["conversation"]["subject"]
            .as_str()
            .unwrap()
            .contains("Rex"));

        // starting again reuses it
        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/start/{}", rex.id))
            .insert_header(("Authorization", alice_auth.clone()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["conversation"]["id"].as_i64(), Some(conversation_id));
        assert_eq!(body["created"], false);

        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/conversations/{}/send", conversation_id))
            .insert_header(("Authorization", alice_auth.clone()))
            .set_json(serde_json::json!({ "text": "  Is Rex still available?  " }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "Is Rex still available?");
        assert_eq!(body["sender"], "alice");

        let stored = chat_db.list_messages(conversation_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sender_id, Some(alice.id));

        // the owner sees the message when polling
        let req = test::TestRequest::get()
            .uri(&format!("/api/chat/conversations/{}/fetch?after=0", conversation_id))
            .insert_header(("Authorization", owner_auth))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/chat")
            .insert_header(("Authorization", alice_auth))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let conversations = body["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["participants"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_chat_errors_map_to_status_codes() {
        let state = app_state();
        let owner = user(&state.db, "owner");
        let alice = user(&state.db, "alice");
        let mallory = user(&state.db, "mallory");
        let rex = pet(&state.db, "Rex", Some(&owner));
        let alice_auth = login(&state, &alice);
        let mallory_auth = login(&state, &mallory);
        let conversation_id = match state.chat.start_about_pet(&alice, rex.id).unwrap() {
            StartOutcome::Conversation { conversation, .. } => conversation.id,
            StartOutcome::OwnPet => panic!("expected a conversation"),
        };

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/chat").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/chat/start/9999")
            .insert_header(("Authorization", alice_auth.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // outsiders cannot view or post
        let req = test::TestRequest::get()
            .uri(&format!("/api/chat/conversations/{}", conversation_id))
            .insert_header(("Authorization", mallory_auth.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/conversations/{}/send", conversation_id))
            .insert_header(("Authorization", mallory_auth.clone()))
            .set_json(serde_json::json!({ "text": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);

        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/conversations/{}", conversation_id))
            .insert_header(("Authorization", alice_auth.clone()))
            .set_json(serde_json::json!({ "text": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // only admins delete conversations
        let req = test::TestRequest::post()
            .uri(&format!("/api/chat/conversations/{}/delete", conversation_id))
            .insert_header(("Authorization", alice_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_deletes_missing_message() {
        let state = app_state();
        let boss = admin(&state.db, "boss");
        let alice = user(&state.db, "alice");
        let boss_auth = login(&state, &boss);
        let conversation = state.chat.admin_start_chat(&boss, alice.id).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!(
                "/api/chat/conversations/{}/messages/4242/delete",
                conversation.id
            ))
            .insert_header(("Authorization", boss_auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Message not found");
    }
}
