//! Event repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::database::feed::{ChangeFeed, NotifyPayload};
use crate::database::store::{EventStore, EventUpdate};
use crate::models::event::{Event, EventChange, UpdateEventRequest};
use crate::utils::errors::{Result, VolunteerConnectError};

const EVENT_COLUMNS: &str = "id, title, description, location, event_date, start_time, end_time, organizer_id, \
     max_participants, participants, approved_count, created_at, updated_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
    feed: ChangeFeed,
    notify_channel: String,
}

impl EventRepository {
    pub fn new(pool: PgPool, feed: ChangeFeed, notify_channel: impl Into<String>) -> Self {
        Self {
            pool,
            feed,
            notify_channel: notify_channel.into(),
        }
    }

    /// Publish locally and to other processes; the mutation is already committed
    async fn notify(&self, change: EventChange) {
        self.feed.publish(change);

        let payload = NotifyPayload {
            origin: self.feed.origin(),
            change,
        };
        let result = match payload.encode() {
            Ok(payload) => sqlx::query("SELECT pg_notify($1, $2)")
                .bind(&self.notify_channel)
                .bind(payload)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(VolunteerConnectError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(event_id = %change.event_id(), error = %e, "Failed to send change notification");
        }
    }

    async fn exists(&self, event_id: Uuid) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.0)
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn create_event(&self, event: Event) -> Result<Event> {
        let created = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, title, description, location, event_date, start_time, end_time, organizer_id,
                                max_participants, participants, approved_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.event_date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.organizer_id)
        .bind(event.max_participants)
        .bind(&event.participants)
        .bind(event.approved_count)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;

        self.notify(EventChange::Created(created.id)).await;
        Ok(created)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    async fn update_event(&self, event_id: Uuid, request: UpdateEventRequest) -> Result<EventUpdate> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                event_date = COALESCE($5, event_date),
                start_time = COALESCE($6, start_time),
                end_time = COALESCE($7, end_time),
                max_participants = COALESCE($8, max_participants),
                updated_at = NOW()
            WHERE id = $1
              AND ($8::INTEGER IS NULL OR $8 = 0 OR approved_count <= $8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(request.title.as_deref().map(str::trim))
        .bind(request.description)
        .bind(request.location.as_deref().map(str::trim))
        .bind(request.event_date)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.max_participants)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(event) => {
                self.notify(EventChange::Updated(event_id)).await;
                Ok(EventUpdate::Updated(event))
            }
            None => match self.get_event(event_id).await? {
                Some(event) => Ok(EventUpdate::CapacityBelowApproved { approved_count: event.approved_count }),
                None => Ok(EventUpdate::NotFound),
            },
        }
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.notify(EventChange::Deleted(event_id)).await;
        }
        Ok(deleted)
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date ASC, start_time ASC NULLS FIRST, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY event_date ASC, start_time ASC NULLS FIRST"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn add_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool> {
        let added = sqlx::query(
            r#"
            UPDATE events
            SET participants = array_append(participants, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(participants))
            "#
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected() > 0;

        if added {
            self.notify(EventChange::Updated(event_id)).await;
            return Ok(true);
        }
        if !self.exists(event_id).await? {
            return Err(VolunteerConnectError::EventNotFound { event_id });
        }
        Ok(false)
    }

    async fn remove_participant(&self, event_id: Uuid, user_id: &str) -> Result<bool> {
        let removed = sqlx::query(
            r#"
            UPDATE events
            SET participants = array_remove(participants, $2), updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(participants)
            "#
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected() > 0;

        if removed {
            self.notify(EventChange::Updated(event_id)).await;
            return Ok(true);
        }
        if !self.exists(event_id).await? {
            return Err(VolunteerConnectError::EventNotFound { event_id });
        }
        Ok(false)
    }

    async fn apply_approved_delta(&self, event_id: Uuid, delta: i32, enforce_capacity: bool) -> Result<Option<i32>> {
        // The row lock taken by UPDATE serializes concurrent deltas on the same event
        let approved_count: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE events
            SET approved_count = GREATEST(approved_count + $2, 0), updated_at = NOW()
            WHERE id = $1
              AND (NOT $3 OR $2 <= 0 OR max_participants = 0 OR approved_count + $2 <= max_participants)
            RETURNING approved_count
            "#
        )
        .bind(event_id)
        .bind(delta)
        .bind(enforce_capacity)
        .fetch_optional(&self.pool)
        .await?;

        match approved_count {
            Some((count,)) => {
                self.notify(EventChange::Updated(event_id)).await;
                Ok(Some(count))
            }
            None if self.exists(event_id).await? => Ok(None),
            None => Err(VolunteerConnectError::EventNotFound { event_id }),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EventChange> {
        self.feed.subscribe()
    }
}
