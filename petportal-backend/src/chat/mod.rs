//! Conversations spanning the main and chat databases
//!
//! Users and pets live in the main database while conversations, members and
//! messages live in the chat database. `ChatService` reads from one, writes to
//! the other and joins results in memory; no SQL statement touches both files.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::{ChatDatabase, Database};
use crate::models::{
    Conversation, ConversationDetail, ConversationSummary, MessageView, NewNotification, User,
    UserSummary,
};

/// Subject of conversations opened from the admin picker
pub const SUPPORT_SUBJECT: &str = "Support / Admins";
const NOTIFICATION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Result of asking to chat about a pet
#[derive(Debug)]
pub enum StartOutcome {
    /// Existing or new conversation the requester should be sent to
    Conversation { conversation: Conversation, created: bool },
    /// The requester owns the pet; there is nobody to talk to
    OwnPet,
}

/// Tag embedded in subjects so each pet gets its own thread
fn pet_tag(pet_id: i64) -> String {
    format!("(pet:{})", pet_id)
}

fn admin_chat_tag(user_id: i64) -> String {
    format!("(admin-chat:{})", user_id)
}

pub fn conversation_url(conversation_id: i64) -> String {
    format!("/chat/conversation/{}/", conversation_id)
}

pub struct ChatService {
    db: Arc<Database>,
    chat_db: Arc<ChatDatabase>,
}

impl ChatService {
    pub fn new(db: Arc<Database>, chat_db: Arc<ChatDatabase>) -> Self {
        Self { db, chat_db }
    }

    fn require_admin(&self, user: &User) -> ChatResult<()> {
        if !self.db.is_admin(user)? {
            return Err(ChatError::Forbidden("Forbidden".to_string()));
        }
        Ok(())
    }

    fn require_conversation(&self, conversation_id: i64) -> ChatResult<Conversation> {
        self.chat_db
            .get_conversation(conversation_id)?
            .ok_or_else(|| ChatError::NotFound("Conversation not found".to_string()))
    }

    fn notify(&self, recipients: &[i64], actor: &User, verb: &str, message: &str, url: &str) -> ChatResult<()> {
        // chat member ids may point at users that no longer exist
        let existing = self.db.usernames_by_ids(recipients)?;
        for user_id in recipients.iter().filter(|id| existing.contains_key(id)) {
            self.db.create_notification(&NewNotification {
                user_id: *user_id,
                actor_id: Some(actor.id),
                verb: verb.to_string(),
                message: Some(message.to_string()),
                url: Some(url.to_string()),
            })?;
        }
        Ok(())
    }

    /// Resolve member ids to users, keeping member order and skipping unknown ids
    fn participants(&self, member_ids: &[i64], names: &HashMap<i64, String>) -> Vec<UserSummary> {
        member_ids
            .iter()
            .filter_map(|id| {
                names.get(id).map(|username| UserSummary {
                    id: *id,
                    username: username.clone(),
                })
            })
            .collect()
    }

    fn summarize(&self, conversations: Vec<Conversation>) -> ChatResult<Vec<ConversationSummary>> {
        let members: Vec<(Conversation, Vec<i64>)> = conversations
            .into_iter()
            .map(|c| {
                let ids = self.chat_db.member_ids(c.id)?;
                Ok((c, ids))
            })
            .collect::<ChatResult<_>>()?;

        let all_ids: Vec<i64> = members
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names = self.db.usernames_by_ids(&all_ids)?;

        Ok(members
            .into_iter()
            .map(|(conversation, ids)| ConversationSummary {
                title: conversation.display_name(),
                participants: self.participants(&ids, &names),
                conversation,
            })
            .collect())
    }

    // ============================================
    // Starting conversations
    // ============================================

    /// Open (or reuse) the conversation between a pet's owner and the requester
    pub fn start_about_pet(&self, requester: &User, pet_id: i64) -> ChatResult<StartOutcome> {
        let pet = self
            .db
            .get_pet(pet_id)?
            .ok_or_else(|| ChatError::NotFound("Pet not found".to_string()))?;

        let Some(owner_id) = pet.owner_id else {
            return Err(ChatError::BadRequest(
                "No owner is listed for this pet. Please contact admin.".to_string(),
            ));
        };
        if owner_id == requester.id {
            return Ok(StartOutcome::OwnPet);
        }

        let admin_ids: Vec<i64> = self
            .db
            .list_admin_users(Some(requester.id))?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let tag = pet_tag(pet.id);
        if let Some(conversation) = self
            .chat_db
            .find_conversation_with_members(&[owner_id, requester.id], Some(&tag))?
        {
            self.chat_db.add_members(conversation.id, &admin_ids)?;
            return Ok(StartOutcome::Conversation {
                conversation,
                created: false,
            });
        }

        let conversation = self
            .chat_db
            .create_conversation(&format!("About {} {}", pet.name, tag))?;
        self.chat_db.add_member(conversation.id, owner_id)?;
        self.chat_db.add_member(conversation.id, requester.id)?;
        self.chat_db.add_members(conversation.id, &admin_ids)?;

        log::info!(
            "User {} started conversation {} about pet {}",
            requester.username,
            conversation.id,
            pet.id
        );

        let message = format!(
            "{} started a conversation about {}.",
            requester.username, pet.name
        );
        let mut recipients = vec![owner_id];
        recipients.extend(admin_ids.iter().copied().filter(|id| *id != owner_id));
        self.notify(
            &recipients,
            requester,
            "Conversation started",
            &message,
            &conversation_url(conversation.id),
        )?;

        Ok(StartOutcome::Conversation {
            conversation,
            created: true,
        })
    }

    /// Admins the user can pick from when asking for support
    pub fn list_admins(&self, user: &User) -> ChatResult<Vec<UserSummary>> {
        Ok(self
            .db
            .list_admin_users(Some(user.id))?
            .iter()
            .map(User::summary)
            .collect())
    }

    /// Open (or reuse) a conversation between the user and the chosen admins
    pub fn start_with_admins(&self, user: &User, admin_ids: &[i64]) -> ChatResult<Conversation> {
        if admin_ids.is_empty() {
            return Err(ChatError::BadRequest("No admin selected".to_string()));
        }

        let valid: BTreeSet<i64> = self
            .db
            .list_admin_users(Some(user.id))?
            .into_iter()
            .map(|u| u.id)
            .collect();
        if admin_ids.iter().any(|id| !valid.contains(id)) {
            return Err(ChatError::BadRequest("Invalid admin ids".to_string()));
        }

        let selected: Vec<i64> = admin_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let participants: Vec<i64> = selected
            .iter()
            .copied()
            .chain(std::iter::once(user.id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let conversation = match self.chat_db.find_conversation_with_members(&participants, None)? {
            Some(existing) => existing,
            None => self.chat_db.create_conversation(SUPPORT_SUBJECT)?,
        };
        self.chat_db.add_members(conversation.id, &participants)?;

        self.notify(
            &selected,
            user,
            "Conversation started",
            &format!("{} started a conversation with you.", user.username),
            &conversation_url(conversation.id),
        )?;

        Ok(conversation)
    }

    /// Admin-initiated conversation with a single user
    pub fn admin_start_chat(&self, admin: &User, user_id: i64) -> ChatResult<Conversation> {
        self.require_admin(admin)?;

        let target = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| ChatError::NotFound("User not found".to_string()))?;
        if target.id == admin.id {
            return Err(ChatError::BadRequest("Cannot start a chat with yourself".to_string()));
        }

        let tag = admin_chat_tag(target.id);
        if let Some(existing) = self
            .chat_db
            .find_conversation_with_members(&[admin.id, target.id], Some(&tag))?
        {
            return Ok(existing);
        }

        let conversation = self
            .chat_db
            .create_conversation(&format!("Admin chat with {} {}", target.username, tag))?;
        self.chat_db.add_members(conversation.id, &[admin.id, target.id])?;

        self.notify(
            &[target.id],
            admin,
            "Conversation started",
            &format!("{} started a conversation with you.", admin.username),
            &conversation_url(conversation.id),
        )?;

        Ok(conversation)
    }

    // ============================================
    // Reading conversations
    // ============================================

    pub fn index(&self, user: &User) -> ChatResult<Vec<ConversationSummary>> {
        let conversations = self.chat_db.list_conversations_for_user(user.id)?;
        self.summarize(conversations)
    }

    /// Every conversation, for admins
    pub fn admin_list(&self, admin: &User) -> ChatResult<Vec<ConversationSummary>> {
        self.require_admin(admin)?;
        let conversations = self.chat_db.list_conversations()?;
        self.summarize(conversations)
    }

    fn message_views(&self, messages: Vec<crate::models::ChatMessage>) -> ChatResult<Vec<MessageView>> {
        let sender_ids: Vec<i64> = messages
            .iter()
            .filter_map(|m| m.sender_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names = self.db.usernames_by_ids(&sender_ids)?;

        Ok(messages
            .into_iter()
            .map(|m| {
                let sender = m.sender_id.and_then(|id| names.get(&id).cloned());
                MessageView::new(m, sender)
            })
            .collect())
    }

    /// Conversation with participants and messages; members only
    pub fn view(&self, user: &User, conversation_id: i64) -> ChatResult<ConversationDetail> {
        let conversation = self.require_conversation(conversation_id)?;
        if !self.chat_db.is_member(conversation.id, user.id)? {
            return Err(ChatError::NotFound("Conversation not found".to_string()));
        }

        let member_ids = self.chat_db.member_ids(conversation.id)?;
        let names = self.db.usernames_by_ids(&member_ids)?;
        let participants = self.participants(&member_ids, &names);
        let messages = self.message_views(self.chat_db.list_messages(conversation.id)?)?;

        Ok(ConversationDetail {
            conversation,
            participants,
            messages,
        })
    }

    /// Messages newer than `after_id`. Non-members get an empty list.
    pub fn fetch(&self, user: &User, conversation_id: i64, after_id: i64) -> ChatResult<Vec<MessageView>> {
        let conversation = self.require_conversation(conversation_id)?;
        if !self.chat_db.is_member(conversation.id, user.id)? {
            return Ok(Vec::new());
        }
        self.message_views(self.chat_db.list_messages_after(conversation.id, after_id)?)
    }

    // ============================================
    // Writing
    // ============================================

    /// Store a message from a member and notify everyone else in the conversation
    pub fn post_message(&self, user: &User, conversation_id: i64, text: &str) -> ChatResult<MessageView> {
        let conversation = self.require_conversation(conversation_id)?;
        if !self.chat_db.is_member(conversation.id, user.id)? {
            return Err(ChatError::Forbidden("Not a participant".to_string()));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::BadRequest("Empty message".to_string()));
        }

        let message = self.chat_db.create_message(conversation.id, Some(user.id), text)?;

        let recipients: Vec<i64> = self
            .chat_db
            .member_ids(conversation.id)?
            .into_iter()
            .filter(|id| *id != user.id)
            .collect();
        let preview: String = text.chars().take(NOTIFICATION_PREVIEW_CHARS).collect();
        self.notify(
            &recipients,
            user,
            "New message",
            &format!("New message from {}: {}", user.username, preview),
            &conversation_url(conversation.id),
        )?;

        Ok(MessageView::new(message, Some(user.username.clone())))
    }

    /// Remove the user from a conversation. Returns true when the conversation
    /// was deleted because nobody was left.
    pub fn leave(&self, user: &User, conversation_id: i64) -> ChatResult<bool> {
        let conversation = self.require_conversation(conversation_id)?;
        self.chat_db.remove_member(conversation.id, user.id)?;

        if self.chat_db.member_ids(conversation.id)?.is_empty() {
            self.chat_db.delete_conversation(conversation.id)?;
            log::info!("Conversation {} deleted after last member left", conversation.id);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn delete_conversation(&self, user: &User, conversation_id: i64) -> ChatResult<()> {
        let conversation = self.require_conversation(conversation_id)?;
        self.require_admin(user)?;
        self.chat_db.delete_conversation(conversation.id)?;
        log::info!("Admin {} deleted conversation {}", user.username, conversation.id);
        Ok(())
    }

    /// Admin removal of a single message. False when it does not exist.
    pub fn delete_message(&self, user: &User, conversation_id: i64, message_id: i64) -> ChatResult<bool> {
        self.require_admin(user)?;
        let conversation = self.require_conversation(conversation_id)?;
        Ok(self.chat_db.delete_message(conversation.id, message_id)?)
    }
}
