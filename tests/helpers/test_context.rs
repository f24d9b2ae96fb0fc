//! Test context for service-level tests
//!
//! Wires the services to in-memory stores while keeping handles on the
//! concrete stores, so tests can inject faults and inspect raw state.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;
use VolunteerConnect::{
    config::ApprovalCapacityPolicy,
    database::{
        ChangeFeed, DatabaseService, EventStore, MemoryEventStore, MemoryProfileStore,
        MemoryRegistrationLedger, ProfileStore, RegistrationLedger,
    },
    models::{Event, Registration},
    services::{Identity, ListingService, RegistrationService},
    Result,
};

use super::test_data::{create_test_event_request, create_test_profile};

pub struct TestContext {
    pub events: MemoryEventStore,
    pub ledger: MemoryRegistrationLedger,
    pub profiles: MemoryProfileStore,
    pub database: DatabaseService,
    pub registration: RegistrationService,
    pub listing: ListingService,
    pub organizer: Identity,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(ApprovalCapacityPolicy::Enforce)
    }

    pub fn with_policy(policy: ApprovalCapacityPolicy) -> Self {
        let feed = ChangeFeed::new(256);
        let events = MemoryEventStore::new(feed.clone());
        let ledger = MemoryRegistrationLedger::new();
        let profiles = MemoryProfileStore::new();

        let database = DatabaseService::from_stores(
            Arc::new(events.clone()),
            Arc::new(ledger.clone()),
            Arc::new(profiles.clone()),
            feed,
        );

        Self {
            registration: RegistrationService::new(&database, policy),
            listing: ListingService::new(&database),
            events,
            ledger,
            profiles,
            database,
            organizer: Identity::ngo("ngo-1"),
        }
    }

    /// Publish an event owned by the context's organizer
    pub async fn create_event(&self, max_participants: i32) -> Event {
        self.registration
            .create_event(&self.organizer, create_test_event_request(max_participants))
            .await
            .expect("Failed to create test event")
    }

    /// Register a profile and join the event as that volunteer
    pub async fn join(&self, user_id: &str, event_id: Uuid) -> Result<Registration> {
        self.profiles
            .upsert_profile(create_test_profile(user_id))
            .await
            .expect("Failed to store test profile");
        self.registration.join_event(&Identity::volunteer(user_id), event_id).await
    }

    pub async fn approve(&self, user_id: &str, event_id: Uuid) -> Result<()> {
        self.registration
            .approve_participant(&self.organizer, event_id, user_id)
            .await
            .map(|_| ())
    }

    pub async fn event(&self, event_id: Uuid) -> Event {
        self.events
            .get_event(event_id)
            .await
            .expect("Failed to read event")
            .expect("Event should exist")
    }

    pub async fn registrations(&self, event_id: Uuid) -> Vec<Registration> {
        self.ledger.list_for_event(event_id).await.expect("Failed to read ledger")
    }

    pub async fn ledger_is_empty_for(&self, user_id: &str) -> bool {
        self.ledger.list_for_user(user_id).await.expect("Failed to read ledger").is_empty()
    }

    /// Check the cross-store invariants for one event
    pub async fn assert_consistent(&self, event_id: Uuid) {
        let event = self.event(event_id).await;
        let registrations = self.registrations(event_id).await;

        let participants: HashSet<&str> = event.participants.iter().map(String::as_str).collect();
        assert_eq!(participants.len(), event.participants.len(), "duplicate participants: {:?}", event.participants);

        let registered: HashSet<&str> = registrations.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(participants, registered, "participants and ledger disagree");

        let approved = registrations.iter().filter(|r| r.is_approved()).count() as i32;
        assert_eq!(event.approved_count, approved, "approved_count does not match the ledger");

        if self.registration.policy() == ApprovalCapacityPolicy::Enforce && event.has_capacity_limit() {
            assert!(
                event.approved_count <= event.max_participants,
                "over capacity: {}/{}",
                event.approved_count,
                event.max_participants
            );
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
