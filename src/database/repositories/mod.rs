//! Database repositories module
//!
//! PostgreSQL implementations of the store traits

pub mod event;
pub mod registration;
pub mod user;

// Re-export repositories
pub use event::EventRepository;
pub use registration::RegistrationRepository;
pub use user::UserRepository;
