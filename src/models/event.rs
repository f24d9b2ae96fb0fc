//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{Result, VolunteerConnectError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub event_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub organizer_id: String,
    /// `0` means unlimited
    pub max_participants: i32,
    /// Everyone who applied, whatever their registration status
    pub participants: Vec<String>,
    pub approved_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a fresh event record from a validated creation request
    pub fn new(organizer_id: String, request: CreateEventRequest) -> Result<Self> {
        request.validate()?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            description: request.description,
            location: request.location.trim().to_string(),
            event_date: request.event_date,
            start_time: request.start_time,
            end_time: request.end_time,
            organizer_id,
            max_participants: request.max_participants.unwrap_or(0),
            participants: Vec::new(),
            approved_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn has_capacity_limit(&self) -> bool {
        self.max_participants > 0
    }

    /// Full once the approved count reaches the ceiling; pending applicants do not count
    pub fn is_full(&self) -> bool {
        self.has_capacity_limit() && self.approved_count >= self.max_participants
    }

    /// Remaining approval slots, `None` when the event is unlimited
    pub fn remaining_slots(&self) -> Option<i32> {
        if self.has_capacity_limit() {
            Some((self.max_participants - self.approved_count).max(0))
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    /// Apply a partial edit in place
    pub fn apply_update(&mut self, request: &UpdateEventRequest) {
        if let Some(title) = &request.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &request.description {
            self.description = Some(description.clone());
        }
        if let Some(location) = &request.location {
            self.location = location.trim().to_string();
        }
        if let Some(event_date) = request.event_date {
            self.event_date = event_date;
        }
        if let Some(start_time) = request.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = request.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(max_participants) = request.max_participants {
            self.max_participants = max_participants;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub event_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_participants: Option<i32>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(VolunteerConnectError::Validation("title is required".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(VolunteerConnectError::Validation("location is required".to_string()));
        }
        validate_schedule(self.start_time, self.end_time)?;
        validate_capacity(self.max_participants)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_participants: Option<i32>,
}

impl UpdateEventRequest {
    /// Validate the fields present in the request against the event they would edit
    pub fn validate_against(&self, event: &Event) -> Result<()> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(VolunteerConnectError::Validation("title cannot be blank".to_string()));
        }
        if matches!(&self.location, Some(location) if location.trim().is_empty()) {
            return Err(VolunteerConnectError::Validation("location cannot be blank".to_string()));
        }
        validate_schedule(
            self.start_time.or(event.start_time),
            self.end_time.or(event.end_time),
        )?;
        validate_capacity(self.max_participants)
    }
}

fn validate_schedule(start_time: Option<NaiveTime>, end_time: Option<NaiveTime>) -> Result<()> {
    match (start_time, end_time) {
        (Some(start), Some(end)) if end <= start => Err(VolunteerConnectError::Validation(
            format!("end time {} must be after start time {}", end, start),
        )),
        _ => Ok(()),
    }
}

fn validate_capacity(max_participants: Option<i32>) -> Result<()> {
    match max_participants {
        Some(max) if max < 0 => Err(VolunteerConnectError::Validation(
            format!("max participants cannot be negative (got {})", max),
        )),
        _ => Ok(()),
    }
}

/// Change notification published by an event store after every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "event_id", rename_all = "snake_case")]
pub enum EventChange {
    Created(Uuid),
    Updated(Uuid),
    Deleted(Uuid),
}

impl EventChange {
    pub fn event_id(&self) -> Uuid {
        match self {
            EventChange::Created(id) | EventChange::Updated(id) | EventChange::Deleted(id) => *id,
        }
    }
}
