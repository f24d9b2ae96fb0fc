//! Storage seams
//!
//! The services only talk to these traits. Every method is a single atomic
//! operation on the backing store; the services never cache authoritative
//! values between calls.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Event, EventChange, Registration, RegistrationStatus, UpdateEventRequest, UserProfile};
use crate::utils::errors::Result;

/// Outcome of an event edit
#[derive(Debug, Clone, PartialEq)]
pub enum EventUpdate {
    Updated(Event),
    NotFound,
    /// The new ceiling would sit below the number of already approved participants
    CapacityBelowApproved { approved_count: i32 },
}

/// Holds event records and their participant sets
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> Result<Event>;

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>>;

    async fn update_event(&self, event_id: Uuid, request: UpdateEventRequest) -> Result<EventUpdate>;

    /// Returns `false` when the event did not exist
    async fn delete_event(&self, event_id: Uuid) -> Result<bool>;

    async fn list_events(&self) -> Result<Vec<Event>>;

    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>>;

    /// Set-add on `participants`. Returns `false` if the user was already present.
    async fn add_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool>;

    /// Set-remove on `participants`. Returns `false` if the user was absent.
    async fn remove_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool>;

    /// Apply a signed delta to `approved_count`, floored at zero.
    ///
    /// With `enforce_capacity` a positive delta that would push the count past a
    /// non-zero `max_participants` is refused and `None` is returned. Otherwise
    /// the new count is returned.
    async fn apply_approved_delta(&self, event_id: Uuid, delta: i32, enforce_capacity: bool) -> Result<Option<i32>>;

    /// Subscribe to change notifications for this store
    fn subscribe(&self) -> broadcast::Receiver<EventChange>;
}

/// Per-user map of event id to registration record
#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    /// Insert unless an entry for (user, event) already exists. Returns `false` on conflict.
    async fn insert(&self, registration: Registration) -> Result<bool>;

    async fn get(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>>;

    /// Atomically replace the status, returning the previous one (`None` if no entry)
    async fn set_status(&self, user_id: &str, event_id: Uuid, status: RegistrationStatus) -> Result<Option<RegistrationStatus>>;

    async fn remove(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>>;

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Registration>>;

    async fn remove_all_for_event(&self, event_id: Uuid) -> Result<u64>;
}

/// External user-profile store
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Missing ids are silently skipped
    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>>;

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile>;
}
