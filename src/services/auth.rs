//! Identity provider adapter
//!
//! Turns a bearer credential into the caller's stable [`Identity`]. The user id
//! is the token subject; it is the single key used for profiles, participants
//! and registrations.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::utils::errors::{Result, VolunteerConnectError};
use crate::utils::helpers::normalize_user_id;

/// What kind of account the caller holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Ngo,
    Admin,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn volunteer(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: Role::Volunteer }
    }

    pub fn ngo(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: Role::Ngo }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// NGOs and administrators may publish events
    pub fn can_organize(&self) -> bool {
        matches!(self.role, Role::Ngo | Role::Admin)
    }
}

/// Source of caller identities
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Identity>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    exp: i64,
    iat: i64,
}

/// HS256 JWT identity provider
#[derive(Clone)]
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    admin_ids: HashSet<String>,
}

impl JwtIdentityProvider {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(VolunteerConnectError::Config("JWT secret is required".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            admin_ids: config.admin_ids.iter().cloned().collect(),
        })
    }

    /// Sign a token for `user_id`, valid for `ttl`
    pub fn issue_token(&self, user_id: &str, role: Role, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, credential: &str) -> Result<Identity> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential).trim();

        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                warn!(error = %e, "Rejected credential");
                return Err(e.into());
            }
        };

        let user_id = normalize_user_id(&claims.sub)
            .map_err(|e| VolunteerConnectError::Authentication(format!("bad token subject: {}", e)))?;

        let role = if self.admin_ids.contains(&user_id) {
            Role::Admin
        } else {
            claims.role
        };

        debug!(user_id = %user_id, role = ?role, "Caller authenticated");
        Ok(Identity { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(admin_ids: Vec<String>) -> JwtIdentityProvider {
        JwtIdentityProvider::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            leeway_seconds: 0,
            admin_ids,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_identity() {
        let provider = provider(vec![]);
        let token = provider.issue_token("ngo-42", Role::Ngo, Duration::minutes(5)).unwrap();

        let identity = provider.authenticate(&format!("Bearer {}", token)).await.unwrap();
        assert_eq!(identity, Identity::ngo("ngo-42"));
        assert!(identity.can_organize());
    }

    #[tokio::test]
    async fn test_configured_admins_are_promoted() {
        let provider = provider(vec!["root".to_string()]);
        let token = provider.issue_token("root", Role::Volunteer, Duration::minutes(5)).unwrap();

        let identity = provider.authenticate(&token).await.unwrap();
        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let provider = provider(vec![]);
        let token = provider.issue_token("v-1", Role::Volunteer, Duration::minutes(-10)).unwrap();

        assert!(matches!(
            provider.authenticate(&token).await,
            Err(VolunteerConnectError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let other = JwtIdentityProvider::new(&AuthConfig {
            jwt_secret: "someone-else".to_string(),
            leeway_seconds: 0,
            admin_ids: vec![],
        })
        .unwrap();
        let token = other.issue_token("v-1", Role::Volunteer, Duration::minutes(5)).unwrap();

        assert!(provider(vec![]).authenticate(&token).await.is_err());
        assert!(provider(vec![]).authenticate("garbage").await.is_err());
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let result = JwtIdentityProvider::new(&AuthConfig {
            jwt_secret: String::new(),
            leeway_seconds: 0,
            admin_ids: vec![],
        });
        assert!(matches!(result, Err(VolunteerConnectError::Config(_))));
    }
}
