//! Capacity tracking for opportunities.
//!
//! `current_volunteers` is a materialized count of the counted registrations
//! (`pending` and `confirmed`). It is never incremented in place: every
//! status change recounts inside the same store transaction.

use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Opportunity, RegistrationStatus};
use crate::database::store::{StoreError, StoreTransaction};

/// Where a new registration lands given the opportunity's current load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Waitlist,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    pub opportunity_id: Uuid,
    pub max_volunteers: Option<i32>,
    pub current_volunteers: i32,
    /// `None` means no limit.
    pub spots_remaining: Option<i32>,
    pub waitlist_enabled: bool,
    pub waitlist_length: i64,
}

pub fn spots_remaining(max_volunteers: Option<i32>, current_volunteers: i32) -> Option<i32> {
    max_volunteers.map(|max| (max - current_volunteers).max(0))
}

pub fn has_room(max_volunteers: Option<i32>, counted: i64) -> bool {
    max_volunteers.is_none_or(|max| counted < i64::from(max))
}

/// A non-empty waitlist keeps newcomers behind it even when a slot is open.
pub fn admission(opportunity: &Opportunity, counted: i64, waitlisted: i64) -> Admission {
    if opportunity.waitlist_enabled && waitlisted > 0 {
        Admission::Waitlist
    } else if has_room(opportunity.max_volunteers, counted) {
        Admission::Admit
    } else if opportunity.waitlist_enabled {
        Admission::Waitlist
    } else {
        Admission::Full
    }
}

/// Recomputes `current_volunteers` from the ledger and stores it.
pub async fn recount(
    tx: &mut dyn StoreTransaction,
    opportunity_id: Uuid,
) -> Result<Opportunity, StoreError> {
    let counted = tx
        .count_registrations(opportunity_id, RegistrationStatus::COUNTED)
        .await?;
    let counted = i32::try_from(counted).unwrap_or(i32::MAX);

    tx.set_current_volunteers(opportunity_id, counted).await
}

pub async fn snapshot(
    tx: &mut dyn StoreTransaction,
    opportunity: &Opportunity,
) -> Result<CapacitySnapshot, StoreError> {
    let waitlist_length = tx
        .count_registrations(opportunity.id, &[RegistrationStatus::Waitlisted])
        .await?;

    Ok(CapacitySnapshot {
        opportunity_id: opportunity.id,
        max_volunteers: opportunity.max_volunteers,
        current_volunteers: opportunity.current_volunteers,
        spots_remaining: spots_remaining(
            opportunity.max_volunteers,
            opportunity.current_volunteers,
        ),
        waitlist_enabled: opportunity.waitlist_enabled,
        waitlist_length,
    })
}
