//! Error type shared by the state manager, the navigator and the backend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Not allowed to modify this {0}")]
    Forbidden(&'static str),

    #[error("Admin privileges required")]
    AdminRequired,

    #[error("Password hash error: {0}")]
    Password(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PortalError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        PortalError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
