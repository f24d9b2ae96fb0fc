//! Registration service implementation
//!
//! Capacity and approval workflow for event participants. Every operation
//! reads fresh state, runs authorization and capacity checks before touching
//! anything, then issues single-record atomic mutations against the event
//! store and the registration ledger.
//!
//! Between operations the following always hold:
//! - a user is in `event.participants` exactly when a registration exists
//! - `event.approved_count` equals the number of approved registrations
//! - `approved_count <= max_participants` when the event has a limit and the
//!   approval policy is [`ApprovalCapacityPolicy::Enforce`]

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ApprovalCapacityPolicy;
use crate::database::{DatabaseService, EventStore, EventUpdate, RegistrationLedger};
use crate::models::{CreateEventRequest, Event, Registration, RegistrationStatus, UpdateEventRequest};
use crate::services::auth::Identity;
use crate::utils::errors::{Result, VolunteerConnectError};
use crate::utils::logging::{log_event_action, log_registration_action, log_store_failure};

/// Registration service driving the join / approve / reject / remove state machine
#[derive(Clone)]
pub struct RegistrationService {
    events: Arc<dyn EventStore>,
    registrations: Arc<dyn RegistrationLedger>,
    policy: ApprovalCapacityPolicy,
}

impl RegistrationService {
    /// Create a new RegistrationService instance
    pub fn new(database: &DatabaseService, policy: ApprovalCapacityPolicy) -> Self {
        Self {
            events: database.events.clone(),
            registrations: database.registrations.clone(),
            policy,
        }
    }

    pub fn policy(&self) -> ApprovalCapacityPolicy {
        self.policy
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or(VolunteerConnectError::EventNotFound { event_id })
    }

    /// Load an event the caller organizes
    async fn owned_event(&self, caller: &Identity, event_id: Uuid) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if !event.is_organized_by(&caller.user_id) {
            warn!(event_id = %event_id, user_id = %caller.user_id, organizer_id = %event.organizer_id,
                  "Caller does not own event");
            return Err(VolunteerConnectError::NotOwner { user_id: caller.user_id.clone(), event_id });
        }
        Ok(event)
    }

    /// Publish a new event owned by the caller
    pub async fn create_event(&self, caller: &Identity, request: CreateEventRequest) -> Result<Event> {
        debug!(user_id = %caller.user_id, title = %request.title, "Creating event");

        if !caller.can_organize() {
            return Err(VolunteerConnectError::PermissionDenied(
                "only NGO accounts can create events".to_string(),
            ));
        }

        let event = Event::new(caller.user_id.clone(), request)?;
        let event = self.events.create_event(event).await?;

        log_event_action(event.id, "create", &caller.user_id, Some(&event.title));
        Ok(event)
    }

    /// Edit descriptive fields or capacity of an owned event
    pub async fn update_event(&self, caller: &Identity, event_id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        debug!(event_id = %event_id, user_id = %caller.user_id, "Updating event");

        let event = self.owned_event(caller, event_id).await?;
        request.validate_against(&event)?;

        match self.events.update_event(event_id, request).await? {
            EventUpdate::Updated(event) => {
                log_event_action(event_id, "update", &caller.user_id, None);
                Ok(event)
            }
            EventUpdate::NotFound => Err(VolunteerConnectError::EventNotFound { event_id }),
            EventUpdate::CapacityBelowApproved { approved_count } => Err(VolunteerConnectError::Validation(
                format!("max participants cannot drop below the {} already approved", approved_count),
            )),
        }
    }

    /// Delete an event together with every registration pointing at it
    pub async fn delete_event(&self, caller: &Identity, event_id: Uuid) -> Result<()> {
        debug!(event_id = %event_id, user_id = %caller.user_id, "Deleting event");

        let event = self.load_event(event_id).await?;
        if !caller.is_admin() && !event.is_organized_by(&caller.user_id) {
            return Err(VolunteerConnectError::NotOwner { user_id: caller.user_id.clone(), event_id });
        }

        // Ledger first: a retry after a failure here still finds the event and repeats the cleanup
        let removed = self.registrations.remove_all_for_event(event_id).await?;
        self.events.delete_event(event_id).await?;

        log_event_action(event_id, "delete", &caller.user_id, Some(&format!("{} registrations removed", removed)));
        Ok(())
    }

    /// Apply to an event as the calling volunteer
    pub async fn join_event(&self, caller: &Identity, event_id: Uuid) -> Result<Registration> {
        let user_id = caller.user_id.as_str();
        debug!(event_id = %event_id, user_id = %user_id, "Joining event");

        let event = self.load_event(event_id).await?;

        if event.is_participant(user_id) {
            return Err(VolunteerConnectError::AlreadyRegistered { user_id: user_id.to_string(), event_id });
        }

        if event.is_full() {
            info!(event_id = %event_id, user_id = %user_id, approved_count = event.approved_count,
                  max_participants = event.max_participants, "Join refused, event is full");
            return Err(VolunteerConnectError::EventFull {
                event_id,
                approved_count: event.approved_count,
                max_participants: event.max_participants,
            });
        }

        let registration = Registration::pending(user_id, &event, Utc::now());
        if !self.registrations.insert(registration.clone()).await? {
            return Err(VolunteerConnectError::AlreadyRegistered { user_id: user_id.to_string(), event_id });
        }

        if let Err(e) = self.events.add_participant(event_id, user_id).await {
            log_store_failure("join_event", event_id, user_id, &e);
            // Undo the ledger entry so the failed join leaves nothing behind
            if let Err(rollback) = self.registrations.remove(user_id, event_id).await {
                log_store_failure("join_event.rollback", event_id, user_id, &rollback);
            }
            return Err(e);
        }

        // A concurrent remove may have dropped the entry before the participant was added
        if self.registrations.get(user_id, event_id).await?.is_none() {
            warn!(event_id = %event_id, user_id = %user_id, "Registration removed during join, undoing participant");
            self.events.remove_participant(event_id, user_id).await?;
            return Err(VolunteerConnectError::RegistrationNotFound { user_id: user_id.to_string(), event_id });
        }

        log_registration_action(event_id, user_id, "join", &caller.user_id, RegistrationStatus::Pending);
        Ok(registration)
    }

    /// Approve a participant's application
    ///
    /// Approving an already approved participant is a no-op. Under
    /// [`ApprovalCapacityPolicy::Enforce`] the approval is refused with
    /// `EventFull` once every slot is taken.
    pub async fn approve_participant(&self, caller: &Identity, event_id: Uuid, user_id: &str) -> Result<RegistrationStatus> {
        debug!(event_id = %event_id, user_id = %user_id, organizer_id = %caller.user_id, "Approving participant");

        self.owned_event(caller, event_id).await?;
        let current = self.current_registration(event_id, user_id).await?;

        if current.is_approved() {
            debug!(event_id = %event_id, user_id = %user_id, "Participant already approved");
            return Ok(RegistrationStatus::Approved);
        }

        // Reserve the slot first so the capacity check and the increment are one store operation
        let enforce = self.policy == ApprovalCapacityPolicy::Enforce;
        if self.events.apply_approved_delta(event_id, 1, enforce).await?.is_none() {
            let event = self.load_event(event_id).await?;
            info!(event_id = %event_id, user_id = %user_id, approved_count = event.approved_count,
                  max_participants = event.max_participants, "Approval refused, event is full");
            return Err(VolunteerConnectError::EventFull {
                event_id,
                approved_count: event.approved_count,
                max_participants: event.max_participants,
            });
        }

        match self.registrations.set_status(user_id, event_id, RegistrationStatus::Approved).await {
            Ok(Some(previous)) if previous != RegistrationStatus::Approved => {
                log_registration_action(event_id, user_id, "approve", &caller.user_id, RegistrationStatus::Approved);
                Ok(RegistrationStatus::Approved)
            }
            Ok(Some(_)) => {
                // A concurrent approval got there first and already counted this participant
                self.release_slot(event_id, user_id).await?;
                Ok(RegistrationStatus::Approved)
            }
            Ok(None) => {
                // Removed while we were approving
                self.release_slot(event_id, user_id).await?;
                Err(VolunteerConnectError::RegistrationNotFound { user_id: user_id.to_string(), event_id })
            }
            Err(e) => {
                log_store_failure("approve_participant", event_id, user_id, &e);
                if let Err(release) = self.release_slot(event_id, user_id).await {
                    log_store_failure("approve_participant.release", event_id, user_id, &release);
                }
                Err(e)
            }
        }
    }

    /// Reject a participant's application, reversing an earlier approval if needed
    pub async fn reject_participant(&self, caller: &Identity, event_id: Uuid, user_id: &str) -> Result<RegistrationStatus> {
        debug!(event_id = %event_id, user_id = %user_id, organizer_id = %caller.user_id, "Rejecting participant");

        self.owned_event(caller, event_id).await?;

        let previous = self
            .registrations
            .set_status(user_id, event_id, RegistrationStatus::Rejected)
            .await?
            .ok_or_else(|| VolunteerConnectError::RegistrationNotFound { user_id: user_id.to_string(), event_id })?;

        let delta = previous.approved_delta(RegistrationStatus::Rejected);
        if delta != 0 {
            self.events.apply_approved_delta(event_id, delta, false).await?;
        } else if previous == RegistrationStatus::Rejected {
            // Repeated reject: an earlier attempt may have swapped the status but lost the decrement
            self.reconcile_approved_count(event_id).await?;
        }

        log_registration_action(event_id, user_id, "reject", &caller.user_id, RegistrationStatus::Rejected);
        Ok(RegistrationStatus::Rejected)
    }

    /// Remove a participant entirely, whatever their status
    pub async fn remove_participant(&self, caller: &Identity, event_id: Uuid, user_id: &str) -> Result<()> {
        debug!(event_id = %event_id, user_id = %user_id, organizer_id = %caller.user_id, "Removing participant");

        let event = self.owned_event(caller, event_id).await?;

        let removed = self.registrations.remove(user_id, event_id).await?;
        if removed.is_none() {
            // Nothing left in the ledger: either never registered or an earlier attempt was
            // interrupted after the entry went away. Settle the counter before anything else.
            self.reconcile_approved_count(event_id).await?;
            if !event.is_participant(user_id) {
                return Err(VolunteerConnectError::RegistrationNotFound { user_id: user_id.to_string(), event_id });
            }
        }

        self.events.remove_participant(event_id, user_id).await?;

        if removed.as_ref().is_some_and(Registration::is_approved) {
            self.events.apply_approved_delta(event_id, -1, false).await?;
        }

        info!(event_id = %event_id, user_id = %user_id, organizer_id = %caller.user_id,
              previous_status = ?removed.map(|r| r.status), "Participant removed");
        Ok(())
    }

    /// Bring `approved_count` back in line with the ledger after an interrupted operation
    ///
    /// Returns the corrected count. The correction is applied as a delta, so
    /// concurrent approvals are not overwritten.
    pub async fn repair_approved_count(&self, caller: &Identity, event_id: Uuid) -> Result<i32> {
        if !caller.is_admin() {
            return Err(VolunteerConnectError::PermissionDenied(
                "only administrators can repair event counters".to_string(),
            ));
        }

        self.reconcile_approved_count(event_id).await
    }

    /// Recount approved registrations and apply the difference as a delta
    async fn reconcile_approved_count(&self, event_id: Uuid) -> Result<i32> {
        let event = self.load_event(event_id).await?;
        let approved = self
            .registrations
            .list_for_event(event_id)
            .await?
            .iter()
            .filter(|r| r.is_approved())
            .count() as i32;

        let delta = approved - event.approved_count;
        if delta == 0 {
            return Ok(event.approved_count);
        }

        warn!(event_id = %event_id, stored = event.approved_count, expected = approved, "Repairing approved count");
        self.events
            .apply_approved_delta(event_id, delta, false)
            .await?
            .ok_or(VolunteerConnectError::EventNotFound { event_id })
    }

    /// Registration of `user_id` for an event, if any
    pub async fn get_registration(&self, event_id: Uuid, user_id: &str) -> Result<Option<Registration>> {
        self.registrations.get(user_id, event_id).await
    }

    async fn current_registration(&self, event_id: Uuid, user_id: &str) -> Result<Registration> {
        self.registrations
            .get(user_id, event_id)
            .await?
            .ok_or_else(|| VolunteerConnectError::RegistrationNotFound { user_id: user_id.to_string(), event_id })
    }

    async fn release_slot(&self, event_id: Uuid, user_id: &str) -> Result<()> {
        debug!(event_id = %event_id, user_id = %user_id, "Releasing reserved approval slot");
        self.events.apply_approved_delta(event_id, -1, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ChangeFeed;
    use chrono::NaiveDate;

    fn service(policy: ApprovalCapacityPolicy) -> RegistrationService {
        RegistrationService::new(&DatabaseService::in_memory(ChangeFeed::new(64)), policy)
    }

    fn request(max_participants: i32) -> CreateEventRequest {
        CreateEventRequest {
            title: "Tree planting".to_string(),
            description: Some("Bring gloves".to_string()),
            location: "City park".to_string(),
            event_date: NaiveDate::from_ymd_opt(2032, 4, 22).unwrap(),
            start_time: None,
            end_time: None,
            max_participants: Some(max_participants),
        }
    }

    #[tokio::test]
    async fn test_volunteers_cannot_create_events() {
        let service = service(ApprovalCapacityPolicy::Enforce);
        let result = service.create_event(&Identity::volunteer("v1"), request(0)).await;
        assert!(matches!(result, Err(VolunteerConnectError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_join_then_approve_counts_once() {
        let service = service(ApprovalCapacityPolicy::Enforce);
        let ngo = Identity::ngo("ngo");
        let event = service.create_event(&ngo, request(3)).await.unwrap();

        service.join_event(&Identity::volunteer("v1"), event.id).await.unwrap();
        service.approve_participant(&ngo, event.id, "v1").await.unwrap();
        service.approve_participant(&ngo, event.id, "v1").await.unwrap();

        let stored = service.load_event(event.id).await.unwrap();
        assert_eq!(stored.approved_count, 1);
    }

    #[tokio::test]
    async fn test_reject_pending_leaves_count() {
        let service = service(ApprovalCapacityPolicy::Enforce);
        let ngo = Identity::ngo("ngo");
        let event = service.create_event(&ngo, request(0)).await.unwrap();

        service.join_event(&Identity::volunteer("v1"), event.id).await.unwrap();
        let status = service.reject_participant(&ngo, event.id, "v1").await.unwrap();

        assert_eq!(status, RegistrationStatus::Rejected);
        assert_eq!(service.load_event(event.id).await.unwrap().approved_count, 0);
    }

    #[tokio::test]
    async fn test_repair_requires_admin() {
        let service = service(ApprovalCapacityPolicy::Enforce);
        let ngo = Identity::ngo("ngo");
        let event = service.create_event(&ngo, request(0)).await.unwrap();

        assert!(matches!(
            service.repair_approved_count(&ngo, event.id).await,
            Err(VolunteerConnectError::PermissionDenied(_))
        ));
        assert_eq!(service.repair_approved_count(&Identity::admin("root"), event.id).await.unwrap(), 0);
    }
}
