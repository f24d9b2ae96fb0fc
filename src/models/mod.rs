//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod registration;
pub mod user;

// Re-export commonly used models
pub use event::{Event, CreateEventRequest, UpdateEventRequest, EventChange};
pub use registration::{Registration, RegistrationRow, RegistrationStatus, RosterEntry};
pub use user::UserProfile;
