//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use crate::models::Event;
use crate::utils::errors::{Result, VolunteerConnectError};

/// Normalize a user identifier to the single key stored everywhere
pub fn normalize_user_id(raw: &str) -> Result<String> {
    let user_id = raw.trim();
    if user_id.is_empty() {
        return Err(VolunteerConnectError::Validation("user id cannot be empty".to_string()));
    }
    if user_id.chars().any(char::is_whitespace) {
        return Err(VolunteerConnectError::Validation(format!("user id contains whitespace: {:?}", user_id)));
    }
    Ok(user_id.to_string())
}

/// Format an event's date and time window for display
pub fn format_event_schedule(event: &Event) -> String {
    let date = event.event_date.format("%Y-%m-%d");
    match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => format!("{} {}-{}", date, start.format("%H:%M"), end.format("%H:%M")),
        (Some(start), None) => format!("{} from {}", date, start.format("%H:%M")),
        _ => date.to_string(),
    }
}

/// Describe how many approval slots an event has left
pub fn format_capacity(event: &Event) -> String {
    match event.remaining_slots() {
        None => format!("{} approved, unlimited", event.approved_count),
        Some(0) => format!("Event Full ({}/{})", event.approved_count, event.max_participants),
        Some(left) => format!("{}/{} approved, {} left", event.approved_count, event.max_participants, left),
    }
}
