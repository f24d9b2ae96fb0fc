//! Registration ledger repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::RegistrationLedger;
use crate::models::registration::{Registration, RegistrationRow, RegistrationStatus};
use crate::utils::errors::{Result, VolunteerConnectError};

const REGISTRATION_COLUMNS: &str = "user_id, event_id, status, registered_date, event_title, event_date";

#[derive(Clone, Debug)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn convert(rows: Vec<RegistrationRow>) -> Result<Vec<Registration>> {
        rows.into_iter().map(Registration::try_from).collect()
    }
}

#[async_trait]
impl RegistrationLedger for RegistrationRepository {
    async fn insert(&self, registration: Registration) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO registrations (user_id, event_id, status, registered_date, event_title, event_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, event_id) DO NOTHING
            "#
        )
        .bind(&registration.user_id)
        .bind(registration.event_id)
        .bind(registration.status.as_str())
        .bind(registration.registered_date)
        .bind(&registration.event_title)
        .bind(registration.event_date)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            // the event was deleted underneath us
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(VolunteerConnectError::EventNotFound { event_id: registration.event_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn set_status(&self, user_id: &str, event_id: Uuid, status: RegistrationStatus) -> Result<Option<RegistrationStatus>> {
        let previous: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE registrations r
            SET status = $3
            FROM (
                SELECT user_id, event_id, status
                FROM registrations
                WHERE user_id = $1 AND event_id = $2
                FOR UPDATE
            ) old
            WHERE r.user_id = old.user_id AND r.event_id = old.event_id
            RETURNING old.status
            "#
        )
        .bind(user_id)
        .bind(event_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        previous.map(|(status,)| status.parse()).transpose()
    }

    async fn remove(&self, user_id: &str, event_id: Uuid) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "DELETE FROM registrations WHERE user_id = $1 AND event_id = $2 RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY registered_date ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Self::convert(rows)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 ORDER BY event_date ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Self::convert(rows)
    }

    async fn remove_all_for_event(&self, event_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM registrations WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
