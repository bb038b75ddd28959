//! Table routing between the main and chat databases
//!
//! Every table belongs to exactly one database alias. Schema creation consults
//! `allow_migrate` so the chat tables never appear in the main file and the
//! main tables never appear in the chat file.

use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum DbAlias {
    #[strum(serialize = "default")]
    Default,
    #[strum(serialize = "chat_db")]
    Chat,
}

/// Tables stored in the main database, in foreign-key dependency order
pub const MAIN_TABLES: &[&str] = &[
    "users",
    "user_profiles",
    "admin_profiles",
    "auth_sessions",
    "password_reset_tokens",
    "pets",
    "pet_registration_requests",
    "adoption_requests",
    "notifications",
];

/// Tables stored in the chat database, in foreign-key dependency order
pub const CHAT_TABLES: &[&str] = &["chat_conversations", "chat_members", "chat_messages"];

/// Which database a table lives in
pub fn route_table(table: &str) -> DbAlias {
    if CHAT_TABLES.contains(&table) {
        DbAlias::Chat
    } else {
        DbAlias::Default
    }
}

/// Whether `table` may be created in the database named by `alias`
pub fn allow_migrate(alias: DbAlias, table: &str) -> bool {
    route_table(table) == alias
}

/// All tables owned by an alias
pub fn tables_for(alias: DbAlias) -> &'static [&'static str] {
    match alias {
        DbAlias::Default => MAIN_TABLES,
        DbAlias::Chat => CHAT_TABLES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_tables_route_to_chat_db() {
        for table in CHAT_TABLES {
            assert_eq!(route_table(table), DbAlias::Chat);
            assert!(allow_migrate(DbAlias::Chat, table));
            assert!(!allow_migrate(DbAlias::Default, table));
        }
    }

    #[test]
    fn test_other_tables_route_to_default() {
        assert_eq!(route_table("pets"), DbAlias::Default);
        assert_eq!(route_table("users"), DbAlias::Default);
        assert!(!allow_migrate(DbAlias::Chat, "notifications"));
        assert!(allow_migrate(DbAlias::Default, "notifications"));
    }

    #[test]
    fn test_alias_names() {
        assert_eq!(DbAlias::Default.as_ref(), "default");
        assert_eq!(DbAlias::Chat.to_string(), "chat_db");
    }
}
