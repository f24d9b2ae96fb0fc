//! In-memory store backend
//!
//! Used by the `memory` storage backend and by tests. Each method takes the
//! lock once, so every trait call is atomic just like a single statement
//! against PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::feed::ChangeFeed;
use super::store::{EventStore, EventUpdate, ProfileStore, RegistrationLedger};
use crate::models::{Event, EventChange, Registration, RegistrationStatus, UpdateEventRequest, UserProfile};
use crate::utils::errors::{Result, VolunteerConnectError};

/// Scripted store failures, keyed by operation name
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    pending: Arc<Mutex<HashMap<&'static str, u32>>>,
}

impl FaultInjector {
    /// Make the next `times` calls of `operation` fail with `StoreUnavailable`
    pub fn fail_next(&self, operation: &'static str, times: u32) {
        self.pending.lock().insert(operation, times);
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let mut pending = self.pending.lock();
        match pending.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(VolunteerConnectError::StoreUnavailable(format!("injected failure in {}", operation)))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryEventStore {
    events: Arc<Mutex<HashMap<Uuid, Event>>>,
    feed: ChangeFeed,
    faults: FaultInjector,
}

impl MemoryEventStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            events: Arc::new(Mutex::new(HashMap::new())),
            feed,
            faults: FaultInjector::default(),
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    fn sorted(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| {
            a.event_date
                .cmp(&b.event_date)
                .then(a.start_time.cmp(&b.start_time))
                .then(a.created_at.cmp(&b.created_at))
        });
        events
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create_event(&self, event: Event) -> Result<Event> {
        self.faults.check("create_event")?;
        self.events.lock().insert(event.id, event.clone());
        self.feed.publish(EventChange::Created(event.id));
        Ok(event)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
        self.faults.check("get_event")?;
        Ok(self.events.lock().get(&event_id).cloned())
    }

    async fn update_event(&self, event_id: Uuid, request: UpdateEventRequest) -> Result<EventUpdate> {
        self.faults.check("update_event")?;
        let updated = {
            let mut events = self.events.lock();
            let Some(event) = events.get_mut(&event_id) else {
                return Ok(EventUpdate::NotFound);
            };
            if let Some(max) = request.max_participants {
                if max > 0 && max < event.approved_count {
                    return Ok(EventUpdate::CapacityBelowApproved { approved_count: event.approved_count });
                }
            }
            event.apply_update(&request);
            event.clone()
        };
        self.feed.publish(EventChange::Updated(event_id));
        Ok(EventUpdate::Updated(updated))
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<bool> {
        self.faults.check("delete_event")?;
        let removed = self.events.lock().remove(&event_id).is_some();
        if removed {
            self.feed.publish(EventChange::Deleted(event_id));
        }
        Ok(removed)
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        self.faults.check("list_events")?;
        let events = self.events.lock().values().cloned().collect();
        Ok(Self::sorted(events))
    }

    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>> {
        self.faults.check("list_by_organizer")?;
        let events = self
            .events
            .lock()
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        Ok(Self::sorted(events))
    }

    async fn add_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool> {
        self.faults.check("add_participant")?;
        {
            let mut events = self.events.lock();
            let event = events
                .get_mut(&event_id)
                .ok_or(VolunteerConnectError::EventNotFound { event_id })?;
            if event.is_participant(user_id) {
                return Ok(false);
            }
            event.participants.push(user_id.to_string());
            event.updated_at = Utc::now();
        }
        self.feed.publish(EventChange::Updated(event_id));
        Ok(true)
    }

    async fn remove_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool> {
        self.faults.check("remove_participant")?;
        {
            let mut events = self.events.lock();
            let event = events
                .get_mut(&event_id)
                .ok_or(VolunteerConnectError::EventNotFound { event_id })?;
            let before = event.participants.len();
            event.participants.retain(|p| p != user_id);
            if event.participants.len() == before {
                return Ok(false);
            }
            event.updated_at = Utc::now();
        }
        self.feed.publish(EventChange::Updated(event_id));
        Ok(true)
    }

    async fn apply_approved_delta(&self, event_id: Uuid, delta: i32, enforce_capacity: bool) -> Result<Option<i32>> {
        self.faults.check("apply_approved_delta")?;
        let approved_count = {
            let mut events = self.events.lock();
            let event = events
                .get_mut(&event_id)
                .ok_or(VolunteerConnectError::EventNotFound { event_id })?;
            let next = (event.approved_count + delta).max(0);
            if enforce_capacity && delta > 0 && event.has_capacity_limit() && next > event.max_participants {
                return Ok(None);
            }
            event.approved_count = next;
            event.updated_at = Utc::now();
            next
        };
        self.feed.publish(EventChange::Updated(event_id));
        Ok(Some(approved_count))
    }

    fn subscribe(&self) -> broadcast::Receiver<EventChange> {
        self.feed.subscribe()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistrationLedger {
    /// user id -> event id -> registration
    entries: Arc<Mutex<HashMap<String, HashMap<Uuid, Registration>>>>,
    faults: FaultInjector,
}

impl MemoryRegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }
}

#[async_trait]
impl RegistrationLedger for MemoryRegistrationLedger {
    async fn insert(&self, registration: Registration) -> Result<bool> {
        self.faults.check("insert")?;
        let mut entries = self.entries.lock();
        let per_user = entries.entry(registration.user_id.clone()).or_default();
        if per_user.contains_key(&registration.event_id) {
            return Ok(false);
        }
        per_user.insert(registration.event_id, registration);
        Ok(true)
    }

    async fn get(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>> {
        self.faults.check("get")?;
        Ok(self
            .entries
            .lock()
            .get(user_id)
            .and_then(|per_user| per_user.get(&event_id))
            .cloned())
    }

    async fn set_status(&self, user_id: &str, event_id: Uuid, status: RegistrationStatus) -> Result<Option<RegistrationStatus>> {
        self.faults.check("set_status")?;
        let mut entries = self.entries.lock();
        let registration = entries
            .get_mut(user_id)
            .and_then(|per_user| per_user.get_mut(&event_id));
        Ok(registration.map(|r| std::mem::replace(&mut r.status, status)))
    }

    async fn remove(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>> {
        self.faults.check("remove")?;
        let mut entries = self.entries.lock();
        let removed = entries.get_mut(user_id).and_then(|per_user| per_user.remove(&event_id));
        if entries.get(user_id).is_some_and(|per_user| per_user.is_empty()) {
            entries.remove(user_id);
        }
        Ok(removed)
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        self.faults.check("list_for_event")?;
        let mut registrations: Vec<Registration> = self
            .entries
            .lock()
            .values()
            .filter_map(|per_user| per_user.get(&event_id).cloned())
            .collect();
        registrations.sort_by_key(|r| r.registered_date);
        Ok(registrations)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Registration>> {
        self.faults.check("list_for_user")?;
        let mut registrations: Vec<Registration> = self
            .entries
            .lock()
            .get(user_id)
            .map(|per_user| per_user.values().cloned().collect())
            .unwrap_or_default();
        registrations.sort_by_key(|r| r.event_date);
        Ok(registrations)
    }

    async fn remove_all_for_event(&self, event_id: Uuid) -> Result<u64> {
        self.faults.check("remove_all_for_event")?;
        let mut entries = self.entries.lock();
        let mut removed = 0;
        for per_user in entries.values_mut() {
            if per_user.remove(&event_id).is_some() {
                removed += 1;
            }
        }
        entries.retain(|_, per_user| !per_user.is_empty());
        Ok(removed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<Mutex<HashMap<String, UserProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a profile out of band, as an external admin tool would
    pub fn delete_profile(&self, user_id: &str) -> bool {
        self.profiles.lock().remove(user_id).is_some()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().get(user_id).cloned())
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>> {
        let profiles = self.profiles.lock();
        Ok(user_ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }

    async fn upsert_profile(&self, mut profile: UserProfile) -> Result<UserProfile> {
        let mut profiles = self.profiles.lock();
        if let Some(existing) = profiles.get(&profile.user_id) {
            profile.created_at = existing.created_at;
        }
        profile.updated_at = Utc::now();
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateEventRequest;
    use chrono::NaiveDate;

    fn event(max_participants: i32) -> Event {
        Event::new(
            "ngo-1".to_string(),
            CreateEventRequest {
                title: "Food bank shift".to_string(),
                description: None,
                location: "Warehouse".to_string(),
                event_date: NaiveDate::from_ymd_opt(2031, 1, 15).unwrap(),
                start_time: None,
                end_time: None,
                max_participants: Some(max_participants),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_participant_set_semantics() {
        let store = MemoryEventStore::new(ChangeFeed::new(16));
        let event = store.create_event(event(0)).await.unwrap();

        assert!(store.add_participant(event.id, "u1").await.unwrap());
        assert!(!store.add_participant(event.id, "u1").await.unwrap());
        assert_eq!(store.get_event(event.id).await.unwrap().unwrap().participants, vec!["u1"]);

        assert!(store.remove_participant(event.id, "u1").await.unwrap());
        assert!(!store.remove_participant(event.id, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_approved_delta_floors_and_caps() {
        let store = MemoryEventStore::new(ChangeFeed::new(16));
        let event = store.create_event(event(1)).await.unwrap();

        assert_eq!(store.apply_approved_delta(event.id, -1, true).await.unwrap(), Some(0));
        assert_eq!(store.apply_approved_delta(event.id, 1, true).await.unwrap(), Some(1));
        assert_eq!(store.apply_approved_delta(event.id, 1, true).await.unwrap(), None);
        assert_eq!(store.apply_approved_delta(event.id, 1, false).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_update_refuses_capacity_below_approved() {
        let store = MemoryEventStore::new(ChangeFeed::new(16));
        let event = store.create_event(event(5)).await.unwrap();
        store.apply_approved_delta(event.id, 3, true).await.unwrap();

        let request = UpdateEventRequest { max_participants: Some(2), ..Default::default() };
        assert_eq!(
            store.update_event(event.id, request).await.unwrap(),
            EventUpdate::CapacityBelowApproved { approved_count: 3 }
        );

        // lifting the limit is always fine
        let request = UpdateEventRequest { max_participants: Some(0), ..Default::default() };
        assert!(matches!(store.update_event(event.id, request).await.unwrap(), EventUpdate::Updated(_)));
    }

    #[tokio::test]
    async fn test_mutations_publish_changes() {
        let feed = ChangeFeed::new(16);
        let store = MemoryEventStore::new(feed.clone());
        let mut changes = store.subscribe();

        let event = store.create_event(event(0)).await.unwrap();
        store.add_participant(event.id, "u1").await.unwrap();
        store.delete_event(event.id).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), EventChange::Created(event.id));
        assert_eq!(changes.recv().await.unwrap(), EventChange::Updated(event.id));
        assert_eq!(changes.recv().await.unwrap(), EventChange::Deleted(event.id));
    }

    #[tokio::test]
    async fn test_ledger_status_swap_returns_previous() {
        let ledger = MemoryRegistrationLedger::new();
        let registration = Registration::pending("u1", &event(0), Utc::now());
        let event_id = registration.event_id;

        assert!(ledger.insert(registration.clone()).await.unwrap());
        assert!(!ledger.insert(registration).await.unwrap());

        assert_eq!(
            ledger.set_status("u1", event_id, RegistrationStatus::Approved).await.unwrap(),
            Some(RegistrationStatus::Pending)
        );
        assert_eq!(
            ledger.set_status("u1", event_id, RegistrationStatus::Approved).await.unwrap(),
            Some(RegistrationStatus::Approved)
        );
        assert_eq!(ledger.set_status("u2", event_id, RegistrationStatus::Approved).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ledger_cascade_removal() {
        let ledger = MemoryRegistrationLedger::new();
        let first = event(0);
        let second = event(0);
        for user in ["a", "b", "c"] {
            ledger.insert(Registration::pending(user, &first, Utc::now())).await.unwrap();
        }
        ledger.insert(Registration::pending("a", &second, Utc::now())).await.unwrap();

        assert_eq!(ledger.remove_all_for_event(first.id).await.unwrap(), 3);
        assert!(ledger.list_for_event(first.id).await.unwrap().is_empty());
        assert_eq!(ledger.list_for_user("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fault_injection_is_counted() {
        let ledger = MemoryRegistrationLedger::new();
        ledger.faults().fail_next("get", 1);

        assert!(matches!(
            ledger.get("u1", Uuid::new_v4()).await,
            Err(VolunteerConnectError::StoreUnavailable(_))
        ));
        assert!(ledger.get("u1", Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleared_faults_do_not_fire() {
        let store = MemoryEventStore::new(ChangeFeed::new(16));
        store.faults().fail_next("list_events", 3);
        assert!(store.list_events().await.is_err());

        store.faults().clear();
        assert!(store.list_events().await.unwrap().is_empty());
    }
}
