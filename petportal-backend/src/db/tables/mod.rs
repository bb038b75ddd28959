//! Database model modules - extends Database and ChatDatabase with domain-specific methods
//!
//! Each module adds `impl Database` (or `impl ChatDatabase`) blocks with methods
//! for a specific table group.

mod auth;              // auth_sessions, password_reset_tokens
mod users;             // users, user_profiles, admin_profiles
mod pets;              // pets (+ found -> adoption auto-move)
mod registrations;     // pet_registration_requests
mod adoption_requests; // adoption_requests
mod notifications;     // notifications
mod conversations;     // chat_conversations, chat_members (chat db)
mod chat_messages;     // chat_messages (chat db)
