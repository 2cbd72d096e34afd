use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{RegistrationStore, StoreError, StoreTransaction};
use crate::database::{
    models::{
        MemberRole, Opportunity, OpportunityInput, Registration, RegistrationStatus,
        ScheduleEntry,
    },
    utils::sql,
};

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Lock waits longer than this fail with `55P03` and surface as a conflict.
    pub fn with_lock_timeout(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = lock_timeout_ms;
        self
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PgStoreTransaction { tx: Some(tx) }))
    }

    async fn schedule_for_volunteer(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let registrations = sqlx::query_as::<_, Registration>(&sql(r#"
                SELECT
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
                FROM
                    registrations
                WHERE
                    user_id = ?
                    AND status <> 'cancelled'
                ORDER BY
                    created_at DESC
            "#))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let opportunity_ids: Vec<Uuid> = registrations.iter().map(|r| r.opportunity_id).collect();

        let opportunities: HashMap<Uuid, Opportunity> = sqlx::query_as::<_, Opportunity>(&sql(
            "SELECT * FROM opportunities WHERE id = ANY(?)",
        ))
        .bind(&opportunity_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|opportunity| (opportunity.id, opportunity))
        .collect();

        Ok(registrations
            .into_iter()
            .filter_map(|registration| {
                opportunities
                    .get(&registration.opportunity_id)
                    .cloned()
                    .map(|opportunity| ScheduleEntry {
                        registration,
                        opportunity,
                    })
            })
            .collect())
    }
}

pub struct PgStoreTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(StoreError::Database(sqlx::Error::Protocol(
                "transaction already committed".to_string(),
            ))),
        }
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn lock_opportunity(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Opportunity>, StoreError> {
        let opportunity = sqlx::query_as::<_, Opportunity>(&sql(
            "SELECT * FROM opportunities WHERE id = ? FOR UPDATE",
        ))
        .bind(opportunity_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(opportunity)
    }

    async fn find_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(&sql(r#"
                SELECT
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
                FROM
                    registrations
                WHERE
                    id = ?
            "#))
        .bind(registration_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(registration)
    }

    async fn lock_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(&sql(r#"
                SELECT
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
                FROM
                    registrations
                WHERE
                    id = ?
                FOR UPDATE
            "#))
        .bind(registration_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(registration)
    }

    async fn active_registration(
        &mut self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(&sql(r#"
                SELECT
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
                FROM
                    registrations
                WHERE
                    user_id = ?
                    AND opportunity_id = ?
                    AND status <> 'cancelled'
                FOR UPDATE
            "#))
        .bind(user_id)
        .bind(opportunity_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(registration)
    }

    async fn count_registrations(
        &mut self,
        opportunity_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<i64, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let count: i64 = sqlx::query_scalar(&sql(r#"
                SELECT
                    COUNT(*)
                FROM
                    registrations
                WHERE
                    opportunity_id = ?
                    AND status = ANY(?)
            "#))
        .bind(opportunity_id)
        .bind(&statuses)
        .fetch_one(self.conn()?)
        .await?;

        Ok(count)
    }

    async fn earliest_waitlisted(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        let registration = sqlx::query_as::<_, Registration>(&sql(r#"
                SELECT
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
                FROM
                    registrations
                WHERE
                    opportunity_id = ?
                    AND status = 'waitlisted'
                ORDER BY
                    created_at ASC,
                    id ASC
                LIMIT 1
                FOR UPDATE
            "#))
        .bind(opportunity_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(registration)
    }

    async fn insert_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError> {
        let inserted = sqlx::query_as::<_, Registration>(&sql(r#"
                INSERT INTO
                    registrations (
                        id,
                        user_id,
                        opportunity_id,
                        status,
                        hours_logged,
                        notes,
                        checked_in_at,
                        checked_out_at,
                        created_at,
                        updated_at
                    )
                VALUES
                    (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
            "#))
        .bind(registration.id)
        .bind(registration.user_id)
        .bind(registration.opportunity_id)
        .bind(registration.status)
        .bind(registration.hours_logged)
        .bind(&registration.notes)
        .bind(registration.checked_in_at)
        .bind(registration.checked_out_at)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .fetch_one(self.conn()?)
        .await?;

        Ok(inserted)
    }

    async fn update_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError> {
        let updated = sqlx::query_as::<_, Registration>(&sql(r#"
                UPDATE
                    registrations
                SET
                    status = ?,
                    hours_logged = ?,
                    notes = ?,
                    checked_in_at = ?,
                    checked_out_at = ?,
                    updated_at = ?
                WHERE
                    id = ?
                RETURNING
                    id,
                    user_id,
                    opportunity_id,
                    status,
                    hours_logged,
                    notes,
                    checked_in_at,
                    checked_out_at,
                    created_at,
                    updated_at
            "#))
        .bind(registration.status)
        .bind(registration.hours_logged)
        .bind(&registration.notes)
        .bind(registration.checked_in_at)
        .bind(registration.checked_out_at)
        .bind(registration.updated_at)
        .bind(registration.id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(updated)
    }

    async fn set_current_volunteers(
        &mut self,
        opportunity_id: Uuid,
        current_volunteers: i32,
    ) -> Result<Opportunity, StoreError> {
        let opportunity = sqlx::query_as::<_, Opportunity>(&sql(r#"
                UPDATE
                    opportunities
                SET
                    current_volunteers = ?,
                    updated_at = NOW()
                WHERE
                    id = ?
                RETURNING
                    *
            "#))
        .bind(current_volunteers)
        .bind(opportunity_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(opportunity)
    }

    async fn update_opportunity(
        &mut self,
        opportunity_id: Uuid,
        input: &OpportunityInput,
    ) -> Result<Opportunity, StoreError> {
        let opportunity = sqlx::query_as::<_, Opportunity>(&sql(r#"
                UPDATE
                    opportunities
                SET
                    title = ?,
                    description = ?,
                    short_description = ?,
                    category = ?,
                    skills_needed = ?,
                    location_type = ?,
                    address = ?,
                    city = ?,
                    start_date = ?,
                    end_date = ?,
                    recurrence = ?,
                    max_volunteers = ?,
                    waitlist_enabled = ?,
                    image_url = ?,
                    updated_at = NOW()
                WHERE
                    id = ?
                RETURNING
                    *
            "#))
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(&input.short_description)
        .bind(&input.category)
        .bind(&input.skills_needed)
        .bind(input.location_type)
        .bind(&input.address)
        .bind(&input.city)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.recurrence)
        .bind(input.max_volunteers)
        .bind(input.waitlist_enabled)
        .bind(&input.image_url)
        .bind(opportunity_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(opportunity)
    }

    async fn member_role(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MemberRole>, StoreError> {
        let role = sqlx::query_scalar::<_, MemberRole>(&sql(r#"
                SELECT
                    role
                FROM
                    organization_members
                WHERE
                    user_id = ?
                    AND organization_id = ?
            "#))
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(role)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => Ok(tx.commit().await?),
            None => Ok(()),
        }
    }
}
