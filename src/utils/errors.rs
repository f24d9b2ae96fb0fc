//! Error handling for VolunteerConnect
//!
//! This module defines the main error type used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for VolunteerConnect
#[derive(Error, Debug)]
pub enum VolunteerConnectError {
    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("No registration for user {user_id} on event {event_id}")]
    RegistrationNotFound { user_id: String, event_id: Uuid },

    #[error("User {user_id} is already registered for event {event_id}")]
    AlreadyRegistered { user_id: String, event_id: Uuid },

    #[error("Event {event_id} is full ({approved_count}/{max_participants} approved)")]
    EventFull {
        event_id: Uuid,
        approved_count: i32,
        max_participants: i32,
    },

    #[error("User {user_id} is not the organizer of event {event_id}")]
    NotOwner { user_id: String, event_id: Uuid },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for VolunteerConnect operations
pub type Result<T> = std::result::Result<T, VolunteerConnectError>;

impl From<sqlx::Error> for VolunteerConnectError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => VolunteerConnectError::StoreUnavailable(error.to_string()),
            other => VolunteerConnectError::Database(other),
        }
    }
}

impl From<config::ConfigError> for VolunteerConnectError {
    fn from(error: config::ConfigError) -> Self {
        VolunteerConnectError::Config(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for VolunteerConnectError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        VolunteerConnectError::Authentication(error.to_string())
    }
}

impl VolunteerConnectError {
    /// Check if the whole operation may safely be retried by the caller
    pub fn is_recoverable(&self) -> bool {
        match self {
            VolunteerConnectError::EventNotFound { .. } => false,
            VolunteerConnectError::RegistrationNotFound { .. } => false,
            VolunteerConnectError::AlreadyRegistered { .. } => false,
            VolunteerConnectError::EventFull { .. } => false,
            VolunteerConnectError::NotOwner { .. } => false,
            VolunteerConnectError::StoreUnavailable(_) => true,
            VolunteerConnectError::Validation(_) => false,
            VolunteerConnectError::PermissionDenied(_) => false,
            VolunteerConnectError::Authentication(_) => false,
            VolunteerConnectError::Config(_) => false,
            VolunteerConnectError::Database(_) => false,
            VolunteerConnectError::Migration(_) => false,
            VolunteerConnectError::Serialization(_) => false,
            VolunteerConnectError::Io(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VolunteerConnectError::Database(_) => ErrorSeverity::Critical,
            VolunteerConnectError::Migration(_) => ErrorSeverity::Critical,
            VolunteerConnectError::Config(_) => ErrorSeverity::Critical,
            VolunteerConnectError::NotOwner { .. } => ErrorSeverity::Warning,
            VolunteerConnectError::PermissionDenied(_) => ErrorSeverity::Warning,
            VolunteerConnectError::Authentication(_) => ErrorSeverity::Warning,
            VolunteerConnectError::EventNotFound { .. }
            | VolunteerConnectError::RegistrationNotFound { .. }
            | VolunteerConnectError::AlreadyRegistered { .. }
            | VolunteerConnectError::EventFull { .. }
            | VolunteerConnectError::Validation(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
