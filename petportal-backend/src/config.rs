use std::env;

pub const DEFAULT_ADMIN_REGISTRATION_CODE: &str = "PET_ADMIN_2025";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub chat_database_url: String,
    pub admin_registration_code: String,
    pub session_ttl_hours: i64,
    /// Base used to build password reset links
    pub public_base_url: String,
    pub frontend_dist: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "./.db/petportal.sqlite3".to_string(),
            chat_database_url: "./.db/chat.sqlite3".to_string(),
            admin_registration_code: DEFAULT_ADMIN_REGISTRATION_CODE.to_string(),
            session_ttl_hours: 24,
            public_base_url: "http://localhost:8080".to_string(),
            frontend_dist: "./frontend/dist".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_var("PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            chat_database_url: env::var("CHAT_DATABASE_URL").unwrap_or(defaults.chat_database_url),
            admin_registration_code: env::var("ADMIN_REGISTRATION_CODE")
                .unwrap_or(defaults.admin_registration_code),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", defaults.session_ttl_hours),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            frontend_dist: env::var("FRONTEND_DIST").unwrap_or(defaults.frontend_dist),
        }
    }
}

/// Read a numeric variable, keeping the default when it is unset or malformed
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", name, value);
            default
        }),
        Err(_) => default,
    }
}
