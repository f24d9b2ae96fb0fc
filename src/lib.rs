//! VolunteerConnect
//!
//! Event registration and approval service connecting volunteers with NGOs.
//! This library provides the capacity and approval workflow for event
//! participants, the read-side listings built on top of it, and the store
//! abstractions both run against.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{VolunteerConnectError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::{ServiceFactory, RegistrationService, ListingService, Identity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
