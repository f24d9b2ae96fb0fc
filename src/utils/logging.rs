//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the VolunteerConnect service.

use tracing::{info, warn, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use crate::config::LoggingConfig;
use crate::models::RegistrationStatus;
use crate::utils::errors::{Result, VolunteerConnectError};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "volunteer-connect.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| VolunteerConnectError::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| VolunteerConnectError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a participant state change
pub fn log_registration_action(event_id: Uuid, user_id: &str, action: &str, actor: &str, status: RegistrationStatus) {
    info!(
        event_id = %event_id,
        user_id = user_id,
        action = action,
        actor = actor,
        status = %status,
        "Registration updated"
    );
}

/// Log event management actions
pub fn log_event_action(event_id: Uuid, action: &str, user_id: &str, details: Option<&str>) {
    info!(
        event_id = %event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log a store failure in the middle of a workflow operation
pub fn log_store_failure(operation: &str, event_id: Uuid, user_id: &str, error: &VolunteerConnectError) {
    if error.is_recoverable() {
        warn!(
            operation = operation,
            event_id = %event_id,
            user_id = user_id,
            error = %error,
            "Store operation failed, caller may retry"
        );
    } else {
        error!(
            operation = operation,
            event_id = %event_id,
            user_id = user_id,
            error = %error,
            severity = %error.severity(),
            "Store operation failed"
        );
    }
}
