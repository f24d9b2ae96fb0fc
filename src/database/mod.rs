//! Database module
//!
//! This module holds the store traits and their in-memory and PostgreSQL
//! implementations, plus the event change feed

pub mod connection;
pub mod feed;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, DatabaseConfig, create_pool, run_migrations, health_check};
pub use feed::{ChangeFeed, spawn_notify_listener};
pub use memory::{FaultInjector, MemoryEventStore, MemoryRegistrationLedger, MemoryProfileStore};
pub use repositories::{EventRepository, RegistrationRepository, UserRepository};
pub use service::DatabaseService;
pub use store::{EventStore, EventUpdate, RegistrationLedger, ProfileStore};
