//! Event change feed
//!
//! Stores publish an [`EventChange`] after every mutation. Subscribers treat a
//! notification as "something changed" and re-read the whole view.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::DatabasePool;
use crate::models::EventChange;
use crate::utils::errors::Result;

/// In-process fan-out of event changes
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<EventChange>,
    origin: Uuid,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            origin: Uuid::new_v4(),
        }
    }

    /// Identifier of this process on the shared notify channel
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn publish(&self, change: EventChange) {
        // no receivers is fine
        let receivers = self.sender.send(change).unwrap_or(0);
        debug!(event_id = %change.event_id(), change = ?change, receivers = receivers, "Event change published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventChange> {
        self.sender.subscribe()
    }
}

/// Payload carried over Postgres NOTIFY
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyPayload {
    pub origin: Uuid,
    pub change: EventChange,
}

impl NotifyPayload {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Bridge NOTIFY messages written by other processes into the local feed
pub async fn spawn_notify_listener(pool: &DatabasePool, channel: &str, feed: ChangeFeed) -> Result<JoinHandle<()>> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    info!(channel = %channel, "Listening for event change notifications");

    let handle = tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => match NotifyPayload::decode(notification.payload()) {
                    Ok(payload) if payload.origin == feed.origin() => {}
                    Ok(payload) => feed.publish(payload.change),
                    Err(e) => warn!(error = %e, payload = %notification.payload(), "Ignoring malformed change notification"),
                },
                Err(e) => {
                    // PgListener reconnects on its own; a hard error here means the pool is gone
                    error!(error = %e, "Change notification listener stopped");
                    break;
                }
            }
        }
    });

    Ok(handle)
}
