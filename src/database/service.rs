//! Database service layer
//!
//! Bundles one implementation of each store trait behind shared handles

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Settings, StorageBackend};
use crate::database::connection::{create_pool, health_check, run_migrations, DatabaseConfig, DatabasePool};
use crate::database::feed::{spawn_notify_listener, ChangeFeed};
use crate::database::memory::{MemoryEventStore, MemoryProfileStore, MemoryRegistrationLedger};
use crate::database::repositories::{EventRepository, RegistrationRepository, UserRepository};
use crate::database::store::{EventStore, ProfileStore, RegistrationLedger};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventStore>,
    pub registrations: Arc<dyn RegistrationLedger>,
    pub profiles: Arc<dyn ProfileStore>,
    pub feed: ChangeFeed,
    notify_listener: Option<Arc<JoinHandle<()>>>,
}

impl DatabaseService {
    /// Bundle already constructed stores
    pub fn from_stores(
        events: Arc<dyn EventStore>,
        registrations: Arc<dyn RegistrationLedger>,
        profiles: Arc<dyn ProfileStore>,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            events,
            registrations,
            profiles,
            feed,
            notify_listener: None,
        }
    }

    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: DatabasePool, feed: ChangeFeed, notify_channel: &str) -> Self {
        Self::from_stores(
            Arc::new(EventRepository::new(pool.clone(), feed.clone(), notify_channel)),
            Arc::new(RegistrationRepository::new(pool.clone())),
            Arc::new(UserRepository::new(pool)),
            feed,
        )
    }

    /// Volatile stores, one process only
    pub fn in_memory(feed: ChangeFeed) -> Self {
        Self::from_stores(
            Arc::new(MemoryEventStore::new(feed.clone())),
            Arc::new(MemoryRegistrationLedger::new()),
            Arc::new(MemoryProfileStore::new()),
            feed,
        )
    }

    /// Attach the task bridging notifications from other processes
    pub fn with_notify_listener(mut self, handle: JoinHandle<()>) -> Self {
        self.notify_listener = Some(Arc::new(handle));
        self
    }

    /// Whether a notify listener is attached and still running
    pub fn is_listening(&self) -> bool {
        self.notify_listener
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop_notify_listener(&self) {
        if let Some(handle) = &self.notify_listener {
            if handle.is_finished() {
                warn!("Change notification listener had already stopped");
            }
            handle.abort();
        }
    }

    /// Build the backend selected in the settings
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let feed = ChangeFeed::new(settings.feed.channel_capacity);

        match settings.database.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage backend");
                Ok(Self::in_memory(feed))
            }
            StorageBackend::Postgres => {
                info!("Connecting to database...");
                let pool_config = DatabaseConfig::from(&settings.database);
                let pool = create_pool(&pool_config).await?;
                run_migrations(&pool).await?;
                health_check(&pool).await?;
                info!("Database health check passed");

                let listener = spawn_notify_listener(&pool, &settings.database.notify_channel, feed.clone()).await?;
                Ok(Self::postgres(pool, feed, &settings.database.notify_channel).with_notify_listener(listener))
            }
        }
    }
}
