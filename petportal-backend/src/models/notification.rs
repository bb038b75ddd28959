use chrono::{DateTime, Utc};
use serde::Serialize;

/// In-app alert for a user
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: Option<i64>,
    pub verb: String,
    pub message: Option<String>,
    pub url: Option<String>,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub actor_id: Option<i64>,
    pub verb: String,
    pub message: Option<String>,
    pub url: Option<String>,
}
