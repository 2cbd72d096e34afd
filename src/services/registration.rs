use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    MemberRole, Opportunity, OpportunityInput, OpportunityStatus, Registration,
    RegistrationStatus, ScheduleEntry,
};
use crate::database::store::{RegistrationStore, StoreTransaction};
use crate::error::RegistrationError;
use crate::services::capacity::{self, Admission, CapacitySnapshot};
use crate::services::user_context::{Operation, UserContext};
use crate::services::waitlist;

/// Result of a ledger mutation: the touched registration, the opportunity's
/// capacity after the change, and anyone promoted off the waitlist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub registration: Registration,
    pub capacity: CapacitySnapshot,
    pub promoted: Vec<Registration>,
}

/// An edited posting together with anyone its new capacity let in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityChange {
    pub opportunity: Opportunity,
    pub capacity: CapacitySnapshot,
    pub promoted: Vec<Registration>,
}

/// Registration ledger: the only writer of registrations and of
/// `current_volunteers`.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        actor: &UserContext,
        opportunity_id: Uuid,
        notes: Option<String>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        permit(actor, Operation::Register)?;

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        with_retry("register", || {
            self.register_once(actor.user_id, opportunity_id, notes.clone())
        })
        .await
    }

    pub async fn cancel(
        &self,
        actor: &UserContext,
        opportunity_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        permit(actor, Operation::Cancel)?;

        with_retry("cancel", || self.cancel_once(actor.user_id, opportunity_id)).await
    }

    pub async fn schedule(
        &self,
        actor: &UserContext,
    ) -> Result<Vec<ScheduleEntry>, RegistrationError> {
        permit(actor, Operation::ViewSchedule)?;

        Ok(self.store.schedule_for_volunteer(actor.user_id).await?)
    }

    pub async fn confirm(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.roster_update(actor, registration_id, "confirm", |registration| {
            if registration.status != RegistrationStatus::Pending {
                return Err(RegistrationError::InvalidTransition {
                    from: registration.status,
                    action: "confirm",
                });
            }
            transition(registration, RegistrationStatus::Confirmed, "confirm")
        })
        .await
    }

    pub async fn check_in(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.roster_update(actor, registration_id, "check in", |registration| {
            require_confirmed(registration, "check in")?;
            if registration.checked_in_at.is_some() {
                return Err(RegistrationError::AlreadyCheckedIn);
            }

            let now = Utc::now();
            Ok(Registration {
                checked_in_at: Some(now),
                updated_at: now,
                ..registration.clone()
            })
        })
        .await
    }

    pub async fn check_out(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.roster_update(actor, registration_id, "check out", |registration| {
            require_confirmed(registration, "check out")?;
            let Some(checked_in_at) = registration.checked_in_at else {
                return Err(RegistrationError::NotCheckedIn);
            };
            if registration.checked_out_at.is_some() {
                return Err(RegistrationError::InvalidTransition {
                    from: registration.status,
                    action: "check out",
                });
            }

            let now = Utc::now();
            Ok(Registration {
                checked_out_at: Some(now),
                hours_logged: elapsed_hours(checked_in_at, now),
                updated_at: now,
                ..registration.clone()
            })
        })
        .await
    }

    pub async fn complete(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.roster_update(actor, registration_id, "complete", |registration| {
            transition(registration, RegistrationStatus::Completed, "complete")
        })
        .await
    }

    pub async fn log_hours(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
        hours: f64,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(RegistrationError::InvalidHours(hours));
        }

        self.roster_update(actor, registration_id, "log hours for", |registration| {
            if registration.status == RegistrationStatus::Cancelled {
                return Err(RegistrationError::InvalidTransition {
                    from: registration.status,
                    action: "log hours for",
                });
            }

            Ok(Registration {
                hours_logged: hours,
                updated_at: Utc::now(),
                ..registration.clone()
            })
        })
        .await
    }

    /// Applies an edit to a posting and fills any capacity it opens from the
    /// waitlist, all under one opportunity lock.
    pub async fn update_opportunity(
        &self,
        actor: &UserContext,
        opportunity_id: Uuid,
        input: &OpportunityInput,
    ) -> Result<OpportunityChange, RegistrationError> {
        permit(actor, Operation::ManageOpportunities)?;

        with_retry("update opportunity", || async move {
            let mut tx = self.store.begin().await?;
            let opportunity = lock_opportunity(tx.as_mut(), opportunity_id).await?;
            authorize_posting(tx.as_mut(), actor, &opportunity).await?;

            let active = tx
                .count_registrations(opportunity_id, RegistrationStatus::COUNTED)
                .await?;
            if input.max_volunteers.is_some_and(|max| i64::from(max) < active) {
                return Err(RegistrationError::CapacityBelowActive { active });
            }

            let updated = tx.update_opportunity(opportunity_id, input).await?;
            let promoted = if updated.waitlist_enabled {
                waitlist::fill_open_slots(tx.as_mut(), opportunity_id, updated.max_volunteers)
                    .await?
            } else {
                Vec::new()
            };

            let opportunity = capacity::recount(tx.as_mut(), opportunity_id).await?;
            let capacity = capacity::snapshot(tx.as_mut(), &opportunity).await?;
            tx.commit().await?;

            log::info!(
                "Opportunity {} updated by user {} ({} promoted from the waitlist)",
                opportunity_id,
                actor.user_id,
                promoted.len()
            );

            Ok(OpportunityChange {
                opportunity,
                capacity,
                promoted,
            })
        })
        .await
    }

    async fn register_once(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
        notes: Option<String>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let mut tx = self.store.begin().await?;
        let opportunity = lock_opportunity(tx.as_mut(), opportunity_id).await?;

        if opportunity.status != OpportunityStatus::Published {
            return Err(RegistrationError::OpportunityClosed(opportunity.status));
        }
        if tx.active_registration(user_id, opportunity_id).await?.is_some() {
            return Err(RegistrationError::AlreadyRegistered);
        }

        // Slots freed without a promotion (completions) go to the queue first.
        let promoted = if opportunity.waitlist_enabled {
            waitlist::fill_open_slots(tx.as_mut(), opportunity_id, opportunity.max_volunteers)
                .await?
        } else {
            Vec::new()
        };

        let counted = tx
            .count_registrations(opportunity_id, RegistrationStatus::COUNTED)
            .await?;
        let waitlisted = tx
            .count_registrations(opportunity_id, &[RegistrationStatus::Waitlisted])
            .await?;
        let status = match capacity::admission(&opportunity, counted, waitlisted) {
            Admission::Admit => RegistrationStatus::Pending,
            Admission::Waitlist => RegistrationStatus::Waitlisted,
            Admission::Full => return Err(RegistrationError::CapacityExceeded),
        };

        let registration = tx
            .insert_registration(&Registration::new(user_id, opportunity_id, status, notes))
            .await?;
        let opportunity = capacity::recount(tx.as_mut(), opportunity_id).await?;
        let capacity = capacity::snapshot(tx.as_mut(), &opportunity).await?;
        tx.commit().await?;

        log::info!(
            "User {} registered for opportunity {} as {}",
            user_id,
            opportunity_id,
            registration.status
        );

        Ok(RegistrationOutcome {
            registration,
            capacity,
            promoted,
        })
    }

    async fn cancel_once(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let mut tx = self.store.begin().await?;
        let opportunity = lock_opportunity(tx.as_mut(), opportunity_id).await?;

        let active = tx
            .active_registration(user_id, opportunity_id)
            .await?
            .ok_or(RegistrationError::NotRegistered)?;
        let cancelled = transition(&active, RegistrationStatus::Cancelled, "cancel")?;

        let counted_before = tx
            .count_registrations(opportunity_id, RegistrationStatus::COUNTED)
            .await?;
        let was_full = !capacity::has_room(opportunity.max_volunteers, counted_before);

        let registration = tx.update_registration(&cancelled).await?;

        let mut promoted = Vec::new();
        if active.status.is_counted() && was_full && opportunity.waitlist_enabled {
            if let Some(next) =
                waitlist::promote_next(tx.as_mut(), opportunity_id, opportunity.max_volunteers)
                    .await?
            {
                promoted.push(next);
            }
        }

        let opportunity = capacity::recount(tx.as_mut(), opportunity_id).await?;
        let capacity = capacity::snapshot(tx.as_mut(), &opportunity).await?;
        tx.commit().await?;

        log::info!(
            "User {} cancelled registration {} for opportunity {} ({} promoted)",
            user_id,
            registration.id,
            opportunity_id,
            promoted.len()
        );

        Ok(RegistrationOutcome {
            registration,
            capacity,
            promoted,
        })
    }

    async fn roster_update<F>(
        &self,
        actor: &UserContext,
        registration_id: Uuid,
        action: &'static str,
        apply: F,
    ) -> Result<RegistrationOutcome, RegistrationError>
    where
        F: Fn(&Registration) -> Result<Registration, RegistrationError>,
    {
        permit(actor, Operation::ManageRoster)?;
        let apply = &apply;

        with_retry(action, || async move {
            let mut tx = self.store.begin().await?;

            // Lock order is opportunity first, then registration, same as register/cancel.
            let opportunity_id = tx
                .find_registration(registration_id)
                .await?
                .ok_or(RegistrationError::RegistrationNotFound(registration_id))?
                .opportunity_id;
            let opportunity = lock_opportunity(tx.as_mut(), opportunity_id).await?;
            authorize_roster(tx.as_mut(), actor, &opportunity).await?;

            let current = tx
                .lock_registration(registration_id)
                .await?
                .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
            let registration = tx.update_registration(&apply(&current)?).await?;

            let opportunity = capacity::recount(tx.as_mut(), opportunity_id).await?;
            let capacity = capacity::snapshot(tx.as_mut(), &opportunity).await?;
            tx.commit().await?;

            log::info!(
                "User {} did '{}' on registration {} ({} -> {})",
                actor.user_id,
                action,
                registration.id,
                current.status,
                registration.status
            );

            Ok(RegistrationOutcome {
                registration,
                capacity,
                promoted: Vec::new(),
            })
        })
        .await
    }
}

/// Runs `operation` and, on a storage conflict, runs it exactly once more.
async fn with_retry<T, F, Fut>(label: &str, operation: F) -> Result<T, RegistrationError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RegistrationError>>,
{
    match operation().await {
        Err(RegistrationError::StorageConflict) => {
            log::warn!("Storage conflict during {}, retrying once", label);
            operation().await
        }
        result => result,
    }
}

fn permit(actor: &UserContext, operation: Operation) -> Result<(), RegistrationError> {
    actor.check(operation).map_err(RegistrationError::Forbidden)
}

async fn lock_opportunity(
    tx: &mut dyn StoreTransaction,
    opportunity_id: Uuid,
) -> Result<Opportunity, RegistrationError> {
    tx.lock_opportunity(opportunity_id)
        .await?
        .ok_or(RegistrationError::OpportunityNotFound(opportunity_id))
}

/// Members of the owning organization and platform admins may work a roster.
async fn authorize_roster(
    tx: &mut dyn StoreTransaction,
    actor: &UserContext,
    opportunity: &Opportunity,
) -> Result<(), RegistrationError> {
    if actor.is_admin() {
        return Ok(());
    }

    match tx
        .member_role(actor.user_id, opportunity.organization_id)
        .await?
    {
        Some(_) => Ok(()),
        None => Err(RegistrationError::Forbidden(
            "You are not a member of the organization that owns this opportunity".to_string(),
        )),
    }
}

/// Editing a posting takes an owner or admin of the organization, or a platform admin.
async fn authorize_posting(
    tx: &mut dyn StoreTransaction,
    actor: &UserContext,
    opportunity: &Opportunity,
) -> Result<(), RegistrationError> {
    if actor.is_admin() {
        return Ok(());
    }

    match tx
        .member_role(actor.user_id, opportunity.organization_id)
        .await?
    {
        Some(MemberRole::Owner | MemberRole::Admin) => Ok(()),
        Some(_) => Err(RegistrationError::Forbidden(
            "Only owners and admins of the organization can change this opportunity".to_string(),
        )),
        None => Err(RegistrationError::Forbidden(
            "You are not a member of the organization that owns this opportunity".to_string(),
        )),
    }
}

fn transition(
    registration: &Registration,
    next: RegistrationStatus,
    action: &'static str,
) -> Result<Registration, RegistrationError> {
    registration
        .transitioned(next)
        .ok_or(RegistrationError::InvalidTransition {
            from: registration.status,
            action,
        })
}

fn require_confirmed(
    registration: &Registration,
    action: &'static str,
) -> Result<(), RegistrationError> {
    if registration.status == RegistrationStatus::Confirmed {
        Ok(())
    } else {
        Err(RegistrationError::InvalidTransition {
            from: registration.status,
            action,
        })
    }
}

fn elapsed_hours(from: chrono::DateTime<Utc>, to: chrono::DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_seconds().max(0) as f64;
    (seconds / 3600.0 * 100.0).round() / 100.0
}
