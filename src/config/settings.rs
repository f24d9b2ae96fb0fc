//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub registration: RegistrationConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Which store implementation backs the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Postgres NOTIFY channel carrying event change notifications
    pub notify_channel: String,
}

/// Identity provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub leeway_seconds: u64,
    pub admin_ids: Vec<String>,
}

/// Whether Approve re-checks the capacity ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalCapacityPolicy {
    /// Approve refuses once the approved count reaches `max_participants`
    Enforce,
    /// Capacity is only checked when a volunteer joins
    JoinOnly,
}

/// Registration workflow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationConfig {
    pub approval_capacity: ApprovalCapacityPolicy,
}

/// Change feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("VOLUNTEER_CONNECT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::VolunteerConnectError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: "postgresql://localhost/volunteer_connect".to_string(),
                max_connections: 10,
                min_connections: 1,
                notify_channel: "event_changes".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                leeway_seconds: 60,
                admin_ids: vec![],
            },
            registration: RegistrationConfig {
                approval_capacity: ApprovalCapacityPolicy::Enforce,
            },
            feed: FeedConfig {
                channel_capacity: 256,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}
