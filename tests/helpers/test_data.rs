//! Test data helpers for creating event requests and profiles

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use VolunteerConnect::models::{CreateEventRequest, UserProfile};

/// A date `days` away from today (negative for the past)
pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

/// Create a test event request a week from now with the given limit (0 = unlimited)
pub fn create_test_event_request(max_participants: i32) -> CreateEventRequest {
    create_dated_event_request("Beach clean-up", days_from_today(7), max_participants)
}

pub fn create_dated_event_request(title: &str, event_date: NaiveDate, max_participants: i32) -> CreateEventRequest {
    CreateEventRequest {
        title: title.to_string(),
        description: Some("Bags and gloves provided".to_string()),
        location: "North pier".to_string(),
        event_date,
        start_time: NaiveTime::from_hms_opt(9, 0, 0),
        end_time: NaiveTime::from_hms_opt(12, 0, 0),
        max_participants: Some(max_participants),
    }
}

/// Create a test volunteer profile
pub fn create_test_profile(user_id: &str) -> UserProfile {
    UserProfile::new(user_id, format!("Volunteer {}", user_id))
        .with_email(format!("{}@example.org", user_id))
}

/// Volunteer ids `v0..vN`
pub fn volunteer_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("v{}", i)).collect()
}
