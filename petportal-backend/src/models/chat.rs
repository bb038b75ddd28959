use chrono::{DateTime, Utc};
use serde::Serialize;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn display_name(&self) -> String {
        if self.subject.is_empty() {
            format!("Conversation {}", self.id)
        } else {
            self.subject.clone()
        }
    }
}

/// Message row as stored in the chat database
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Message with the sender's username resolved from the main database
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: ChatMessage, sender: Option<String>) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender,
            text: message.text,
            created_at: message.created_at,
        }
    }
}

/// Conversation with its participants, for index listings
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub title: String,
    pub participants: Vec<UserSummary>,
}

/// A single conversation with participants and messages
#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participants: Vec<UserSummary>,
    pub messages: Vec<MessageView>,
}
