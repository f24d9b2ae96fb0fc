//! User profile repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::store::ProfileStore;
use crate::models::user::UserProfile;
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count profiles
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[async_trait]
impl ProfileStore for UserRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, display_name, email, phone, created_at, updated_at FROM users WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>> {
        let profiles = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, display_name, email, phone, created_at, updated_at FROM users WHERE user_id = ANY($1)"
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (user_id, display_name, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                updated_at = NOW()
            RETURNING user_id, display_name, email, phone, created_at, updated_at
            "#
        )
        .bind(&profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}
