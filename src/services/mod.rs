//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod listing;
pub mod registration;

// Re-export commonly used services
pub use auth::{Identity, IdentityProvider, JwtIdentityProvider, Role};
pub use listing::{ListingService, Subscription, EventSnapshotStream};
pub use registration::RegistrationService;

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub registration_service: RegistrationService,
    pub listing_service: ListingService,
    pub identity_provider: JwtIdentityProvider,
    pub database: DatabaseService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, database: DatabaseService) -> Result<Self> {
        let registration_service = RegistrationService::new(&database, settings.registration.approval_capacity);
        let listing_service = ListingService::new(&database);
        let identity_provider = JwtIdentityProvider::new(&settings.auth)?;

        Ok(Self {
            registration_service,
            listing_service,
            identity_provider,
            database,
        })
    }

    /// Resolve a bearer credential into the caller's identity
    pub async fn authenticate(&self, credential: &str) -> Result<Identity> {
        self.identity_provider.authenticate(credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApprovalCapacityPolicy;
    use crate::database::ChangeFeed;

    #[tokio::test]
    async fn test_factory_wires_policy_and_identity() {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "factory-secret".to_string();
        settings.registration.approval_capacity = ApprovalCapacityPolicy::JoinOnly;

        let services = ServiceFactory::new(&settings, DatabaseService::in_memory(ChangeFeed::new(8))).unwrap();
        assert_eq!(services.registration_service.policy(), ApprovalCapacityPolicy::JoinOnly);

        let token = services
            .identity_provider
            .issue_token("v-7", Role::Volunteer, chrono::Duration::minutes(1))
            .unwrap();
        assert_eq!(services.authenticate(&token).await.unwrap(), Identity::volunteer("v-7"));
    }
}
