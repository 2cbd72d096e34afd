//! Storage seam for the registration workflow.
//!
//! Every ledger operation runs inside one [`StoreTransaction`] that starts by
//! locking the opportunity row, so register/cancel/promote on the same
//! opportunity are serialized. Dropping a transaction without calling
//! [`StoreTransaction::commit`] discards its writes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    MemberRole, Opportunity, OpportunityInput, Registration, RegistrationStatus, ScheduleEntry,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRegistrationStore;
pub use postgres::PgRegistrationStore;

const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("an active registration already exists for this volunteer and opportunity")]
    UniqueViolation,

    #[error("concurrent update conflict ({0})")]
    Conflict(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        let code = match &error {
            sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
            _ => None,
        };

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::UniqueViolation,
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
                StoreError::Conflict(code.unwrap_or_default())
            }
            _ => StoreError::Database(error),
        }
    }
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Non-cancelled registrations of a volunteer, newest first.
    async fn schedule_for_volunteer(&self, user_id: Uuid)
    -> Result<Vec<ScheduleEntry>, StoreError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    /// Loads the opportunity and holds its lock until the transaction ends.
    async fn lock_opportunity(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Opportunity>, StoreError>;

    /// Unlocked read, used to discover which opportunity to lock first.
    async fn find_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;

    async fn lock_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;

    async fn active_registration(
        &mut self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;

    async fn count_registrations(
        &mut self,
        opportunity_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<i64, StoreError>;

    /// Oldest waitlisted registration for the opportunity, if any.
    async fn earliest_waitlisted(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;

    async fn insert_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError>;

    async fn update_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError>;

    async fn set_current_volunteers(
        &mut self,
        opportunity_id: Uuid,
        current_volunteers: i32,
    ) -> Result<Opportunity, StoreError>;

    /// Rewrites a posting's details. Status has its own endpoint and is kept.
    async fn update_opportunity(
        &mut self,
        opportunity_id: Uuid,
        input: &OpportunityInput,
    ) -> Result<Opportunity, StoreError>;

    async fn member_role(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MemberRole>, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
}
