use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{RegistrationStore, StoreError, StoreTransaction};
use crate::database::models::{
    MemberRole, Opportunity, OpportunityInput, Registration, RegistrationStatus, ScheduleEntry,
};

#[derive(Debug, Default, Clone)]
struct LedgerState {
    opportunities: HashMap<Uuid, Opportunity>,
    // insertion order doubles as the FIFO tie-breaker
    registrations: Vec<Registration>,
    members: HashMap<(Uuid, Uuid), MemberRole>,
}

impl LedgerState {
    fn registration(&self, registration_id: Uuid) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == registration_id)
    }
}

/// Process-local store with the same transactional contract as Postgres.
///
/// A transaction holds the whole ledger lock, so transactions are fully
/// serialized; writes go to a working copy that only replaces the shared
/// state on commit.
#[derive(Clone, Default)]
pub struct MemoryRegistrationStore {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_opportunity(&self, opportunity: Opportunity) {
        let mut state = self.state.lock().await;
        state.opportunities.insert(opportunity.id, opportunity);
    }

    pub async fn add_member(&self, user_id: Uuid, organization_id: Uuid, role: MemberRole) {
        let mut state = self.state.lock().await;
        state.members.insert((user_id, organization_id), role);
    }

    pub async fn opportunity(&self, opportunity_id: Uuid) -> Option<Opportunity> {
        let state = self.state.lock().await;
        state.opportunities.get(&opportunity_id).cloned()
    }

    pub async fn registrations_for(&self, opportunity_id: Uuid) -> Vec<Registration> {
        let state = self.state.lock().await;
        state
            .registrations
            .iter()
            .filter(|r| r.opportunity_id == opportunity_id)
            .cloned()
            .collect()
    }

    /// Changes capacity directly, bypassing the ledger.
    pub async fn set_max_volunteers(&self, opportunity_id: Uuid, max_volunteers: Option<i32>) {
        let mut state = self.state.lock().await;
        if let Some(opportunity) = state.opportunities.get_mut(&opportunity_id) {
            opportunity.max_volunteers = max_volunteers;
        }
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = LedgerState::clone(&guard);
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            committed: false,
        }))
    }

    async fn schedule_for_volunteer(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let state = self.state.lock().await;

        let mut entries: Vec<ScheduleEntry> = state
            .registrations
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && r.status.is_active())
            .filter_map(|registration| {
                state
                    .opportunities
                    .get(&registration.opportunity_id)
                    .map(|opportunity| ScheduleEntry {
                        registration: registration.clone(),
                        opportunity: opportunity.clone(),
                    })
            })
            .collect();
        entries.sort_by(|a, b| b.registration.created_at.cmp(&a.registration.created_at));

        Ok(entries)
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    committed: bool,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_opportunity(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Opportunity>, StoreError> {
        Ok(self.working.opportunities.get(&opportunity_id).cloned())
    }

    async fn find_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self.working.registration(registration_id).cloned())
    }

    async fn lock_registration(
        &mut self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self.working.registration(registration_id).cloned())
    }

    async fn active_registration(
        &mut self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self
            .working
            .registrations
            .iter()
            .find(|r| {
                r.user_id == user_id && r.opportunity_id == opportunity_id && r.status.is_active()
            })
            .cloned())
    }

    async fn count_registrations(
        &mut self,
        opportunity_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<i64, StoreError> {
        let count = self
            .working
            .registrations
            .iter()
            .filter(|r| r.opportunity_id == opportunity_id && statuses.contains(&r.status))
            .count();
        Ok(count as i64)
    }

    async fn earliest_waitlisted(
        &mut self,
        opportunity_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        // min_by_key keeps the first of equal keys
        Ok(self
            .working
            .registrations
            .iter()
            .filter(|r| {
                r.opportunity_id == opportunity_id && r.status == RegistrationStatus::Waitlisted
            })
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn insert_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError> {
        let duplicate = registration.status.is_active()
            && self.working.registrations.iter().any(|r| {
                r.user_id == registration.user_id
                    && r.opportunity_id == registration.opportunity_id
                    && r.status.is_active()
            });
        if duplicate {
            return Err(StoreError::UniqueViolation);
        }

        self.working.registrations.push(registration.clone());
        Ok(registration.clone())
    }

    async fn update_registration(
        &mut self,
        registration: &Registration,
    ) -> Result<Registration, StoreError> {
        let stored = self
            .working
            .registrations
            .iter_mut()
            .find(|r| r.id == registration.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *stored = registration.clone();
        Ok(registration.clone())
    }

    async fn set_current_volunteers(
        &mut self,
        opportunity_id: Uuid,
        current_volunteers: i32,
    ) -> Result<Opportunity, StoreError> {
        let opportunity = self
            .working
            .opportunities
            .get_mut(&opportunity_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        opportunity.current_volunteers = current_volunteers;
        opportunity.updated_at = Utc::now();
        Ok(opportunity.clone())
    }

    async fn update_opportunity(
        &mut self,
        opportunity_id: Uuid,
        input: &OpportunityInput,
    ) -> Result<Opportunity, StoreError> {
        let opportunity = self
            .working
            .opportunities
            .get_mut(&opportunity_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;

        *opportunity = Opportunity {
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            short_description: input.short_description.clone(),
            category: input.category.clone(),
            skills_needed: input.skills_needed.clone(),
            location_type: input.location_type,
            address: input.address.clone(),
            city: input.city.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            recurrence: input.recurrence,
            max_volunteers: input.max_volunteers,
            waitlist_enabled: input.waitlist_enabled,
            image_url: input.image_url.clone(),
            updated_at: Utc::now(),
            ..opportunity.clone()
        };
        Ok(opportunity.clone())
    }

    async fn member_role(
        &mut self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MemberRole>, StoreError> {
        Ok(self.working.members.get(&(user_id, organization_id)).copied())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if !self.committed {
            *self.guard = std::mem::take(&mut self.working);
            self.committed = true;
        }
        Ok(())
    }
}
