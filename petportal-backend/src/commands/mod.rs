//! Maintenance commands run from the command line instead of the server

pub mod db_status;
pub mod move_found_pets;
pub mod seed;
pub mod sync;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Database file not found: {0}")]
    MissingDatabase(String),
    #[error("Failed to hash password: {0}")]
    Password(String),
}

pub type CommandResult<T> = Result<T, CommandError>;
