//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{VolunteerConnectError, Result};
use super::{Settings, StorageBackend};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_feed_config(&settings.feed)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.backend == StorageBackend::Memory {
        return Ok(());
    }

    if config.url.is_empty() {
        return Err(VolunteerConnectError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(VolunteerConnectError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(VolunteerConnectError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.notify_channel.is_empty()
        || !config.notify_channel.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(VolunteerConnectError::Config(
            format!("Invalid notify channel name: {:?}", config.notify_channel)
        ));
    }

    Ok(())
}

/// Validate identity provider configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(VolunteerConnectError::Config(
            "JWT secret is required".to_string()
        ));
    }

    if config.admin_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(VolunteerConnectError::Config(
            "Admin IDs cannot be blank".to_string()
        ));
    }

    Ok(())
}

/// Validate change feed configuration
fn validate_feed_config(config: &super::FeedConfig) -> Result<()> {
    if config.channel_capacity == 0 {
        return Err(VolunteerConnectError::Config(
            "Feed channel capacity must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(VolunteerConnectError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(VolunteerConnectError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
