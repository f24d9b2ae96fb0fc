//! Listing service implementation
//!
//! Read-only views over the stores. Derived lists are always recomputed from a
//! fresh snapshot; change notifications only say *that* something changed.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use chrono::{NaiveDate, Utc};
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::{DatabaseService, EventStore, ProfileStore, RegistrationLedger};
use crate::models::{Event, Registration, RosterEntry, UserProfile};
use crate::utils::errors::{Result, VolunteerConnectError};

/// Boxed stream of open-event snapshots
pub type EventSnapshotStream = Pin<Box<dyn Stream<Item = Result<Vec<Event>>> + Send>>;

/// Events dated `today` or later, ordered by date then start time
pub fn open_events_from(events: &[Event], today: NaiveDate) -> Vec<Event> {
    let mut open: Vec<Event> = events
        .iter()
        .filter(|event| event.event_date >= today)
        .cloned()
        .collect();
    open.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then(a.start_time.cmp(&b.start_time))
            .then(a.title.cmp(&b.title))
    });
    open
}

/// Join participants against their registrations and profiles
///
/// Participants whose profile (or registration) is missing are dropped: the
/// profile store is external and may lose records out of band.
pub fn build_roster(
    event: &Event,
    registrations: Vec<Registration>,
    profiles: Vec<UserProfile>,
) -> Vec<RosterEntry> {
    let mut registrations: HashMap<String, Registration> = registrations
        .into_iter()
        .map(|r| (r.user_id.clone(), r))
        .collect();
    let mut profiles: HashMap<String, UserProfile> = profiles
        .into_iter()
        .map(|p| (p.user_id.clone(), p))
        .collect();

    let mut roster: Vec<RosterEntry> = event
        .participants
        .iter()
        .filter_map(|user_id| {
            let registration = registrations.remove(user_id);
            let profile = profiles.remove(user_id);
            match (registration, profile) {
                (Some(registration), Some(profile)) => Some(RosterEntry {
                    user_id: user_id.clone(),
                    profile,
                    status: registration.status,
                    registered_date: registration.registered_date,
                }),
                (registration, profile) => {
                    debug!(event_id = %event.id, user_id = %user_id,
                           has_registration = registration.is_some(), has_profile = profile.is_some(),
                           "Skipping orphaned participant");
                    None
                }
            }
        })
        .collect();

    roster.sort_by_key(|entry| entry.registered_date);
    roster
}

/// Listing service for event discovery and participant rosters
#[derive(Clone)]
pub struct ListingService {
    events: Arc<dyn EventStore>,
    registrations: Arc<dyn RegistrationLedger>,
    profiles: Arc<dyn ProfileStore>,
}

impl ListingService {
    /// Create a new ListingService instance
    pub fn new(database: &DatabaseService) -> Self {
        Self {
            events: database.events.clone(),
            registrations: database.registrations.clone(),
            profiles: database.profiles.clone(),
        }
    }

    /// Snapshot of events dated today or later
    pub async fn open_events(&self) -> Result<Vec<Event>> {
        let events = self.events.list_events().await?;
        Ok(open_events_from(&events, Utc::now().date_naive()))
    }

    /// Live feed of open events
    ///
    /// Yields the current snapshot immediately and a recomputed one after every
    /// change notification. A failed read is yielded as an error and the feed
    /// carries on with the next notification; it only ends when the change feed
    /// closes. Nothing runs until the stream is polled; calling this again
    /// starts an independent feed.
    pub fn list_open_events(&self) -> EventSnapshotStream {
        let events = self.events.clone();

        Box::pin(stream! {
            // subscribe before the first read so no change slips between them
            let mut changes = events.subscribe();
            yield events
                .list_events()
                .await
                .map(|snapshot| open_events_from(&snapshot, Utc::now().date_naive()));

            loop {
                match changes.recv().await {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped = skipped, "Change feed lagged, recomputing from scratch");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                // collapse bursts into a single recompute
                while changes.try_recv().is_ok() {}

                yield events
                    .list_events()
                    .await
                    .map(|snapshot| open_events_from(&snapshot, Utc::now().date_naive()));
            }
        })
    }

    /// Keep the latest open-event snapshot in a watch channel until unsubscribed
    pub fn subscribe_open_events(&self) -> Subscription {
        let mut stream = self.list_open_events();
        let (sender, receiver) = watch::channel(Arc::new(Vec::new()));

        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(events) => {
                        if sender.send(Arc::new(events)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to refresh open events"),
                }
            }
        });

        Subscription { receiver, task }
    }

    /// Events organized by `organizer_id`
    pub async fn list_my_events(&self, organizer_id: &str) -> Result<Vec<Event>> {
        self.events.list_by_organizer(organizer_id).await
    }

    /// Registrations held by a volunteer, soonest event first
    pub async fn list_my_registrations(&self, user_id: &str) -> Result<Vec<Registration>> {
        self.registrations.list_for_user(user_id).await
    }

    /// Roster of an event's participants with their profile and status
    pub async fn list_participants(&self, event_id: Uuid) -> Result<Vec<RosterEntry>> {
        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or(VolunteerConnectError::EventNotFound { event_id })?;

        let registrations = self.registrations.list_for_event(event_id).await?;
        let profiles = self.profiles.get_profiles(&event.participants).await?;

        Ok(build_roster(&event, registrations, profiles))
    }
}

/// Handle to a running open-events subscription
pub struct Subscription {
    receiver: watch::Receiver<Arc<Vec<Event>>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Latest snapshot seen so far
    pub fn current(&self) -> Arc<Vec<Event>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<Arc<Vec<Event>>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
