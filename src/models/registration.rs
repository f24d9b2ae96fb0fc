//! Registration model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::event::Event;
use super::user::UserProfile;
use crate::utils::errors::VolunteerConnectError;

/// Approval state of a single (user, event) application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    /// Change to the approved count implied by moving from `self` to `next`
    pub fn approved_delta(&self, next: RegistrationStatus) -> i32 {
        match (*self == RegistrationStatus::Approved, next == RegistrationStatus::Approved) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = VolunteerConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            other => Err(VolunteerConnectError::Validation(format!("unknown registration status: {}", other))),
        }
    }
}

/// One entry of the registration ledger, keyed by (user_id, event_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub user_id: String,
    pub event_id: Uuid,
    pub status: RegistrationStatus,
    pub registered_date: DateTime<Utc>,
    /// Display snapshot taken at join time; may drift from the event
    pub event_title: String,
    pub event_date: NaiveDate,
}

impl Registration {
    pub fn pending(user_id: &str, event: &Event, registered_date: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            event_id: event.id,
            status: RegistrationStatus::Pending,
            registered_date,
            event_title: event.title.clone(),
            event_date: event.event_date,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == RegistrationStatus::Approved
    }
}

/// Raw ledger row as stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationRow {
    pub user_id: String,
    pub event_id: Uuid,
    pub status: String,
    pub registered_date: DateTime<Utc>,
    pub event_title: String,
    pub event_date: NaiveDate,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = VolunteerConnectError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            event_id: row.event_id,
            status: row.status.parse()?,
            registered_date: row.registered_date,
            event_title: row.event_title,
            event_date: row.event_date,
        })
    }
}

/// A participant as shown to the organizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: String,
    pub profile: UserProfile,
    pub status: RegistrationStatus,
    pub registered_date: DateTime<Utc>,
}
