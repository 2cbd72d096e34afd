use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use safha::RegistrationError;
use safha::database::models::{
    MemberRole, OpportunityStatus, Registration, RegistrationStatus, ScheduleEntry,
};
use safha::database::store::{
    MemoryRegistrationStore, RegistrationStore, StoreError, StoreTransaction,
};
use safha::services::RegistrationService;

mod common;

use common::TestLedger;

#[tokio::test]
async fn waitlisted_volunteer_is_promoted_when_the_only_slot_frees() {
    let ledger = TestLedger::new(Some(1), true).await;
    let (a, b) = (common::volunteer(), common::volunteer());

    let first = ledger
        .service
        .register(&a, ledger.opportunity.id, None)
        .await
        .unwrap();
    assert_eq!(first.registration.status, RegistrationStatus::Pending);
    assert_eq!(first.capacity.current_volunteers, 1);
    assert_eq!(first.capacity.spots_remaining, Some(0));

    let second = ledger
        .service
        .register(&b, ledger.opportunity.id, None)
        .await
        .unwrap();
    assert_eq!(second.registration.status, RegistrationStatus::Waitlisted);
    assert_eq!(second.capacity.current_volunteers, 1);
    assert_eq!(second.capacity.waitlist_length, 1);

    let cancelled = ledger
        .service
        .cancel(&a, ledger.opportunity.id)
        .await
        .unwrap();
    assert_eq!(cancelled.registration.status, RegistrationStatus::Cancelled);
    assert_eq!(cancelled.promoted.len(), 1);
    assert_eq!(cancelled.promoted[0].id, second.registration.id);
    assert_eq!(cancelled.promoted[0].status, RegistrationStatus::Confirmed);
    assert_eq!(cancelled.capacity.current_volunteers, 1);
    assert_eq!(cancelled.capacity.waitlist_length, 0);
    assert_eq!(ledger.current_volunteers().await, 1);
}

#[tokio::test]
async fn registering_twice_is_rejected() {
    let ledger = TestLedger::new(Some(5), false).await;
    let volunteer = common::volunteer();

    ledger
        .service
        .register(&volunteer, ledger.opportunity.id, None)
        .await
        .unwrap();
    let again = ledger
        .service
        .register(&volunteer, ledger.opportunity.id, None)
        .await;

    assert!(matches!(again, Err(RegistrationError::AlreadyRegistered)));
    assert_eq!(ledger.current_volunteers().await, 1);
}

#[tokio::test]
async fn volunteer_can_register_again_after_cancelling() {
    let ledger = TestLedger::new(Some(5), false).await;
    let volunteer = common::volunteer();

    ledger
        .service
        .register(&volunteer, ledger.opportunity.id, Some("  bringing gloves ".to_string()))
        .await
        .unwrap();
    ledger
        .service
        .cancel(&volunteer, ledger.opportunity.id)
        .await
        .unwrap();
    let again = ledger
        .service
        .register(&volunteer, ledger.opportunity.id, None)
        .await
        .unwrap();

    assert_eq!(again.registration.status, RegistrationStatus::Pending);
    let history = ledger.store.registrations_for(ledger.opportunity.id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].notes.as_deref(), Some("bringing gloves"));
    assert_eq!(history[0].status, RegistrationStatus::Cancelled);
}

#[tokio::test]
async fn waitlist_is_first_in_first_out() {
    let ledger = TestLedger::new(Some(1), true).await;
    let volunteers: Vec<_> = (0..4).map(|_| common::volunteer()).collect();

    let mut waitlisted = Vec::new();
    for volunteer in &volunteers {
        let outcome = ledger
            .service
            .register(volunteer, ledger.opportunity.id, None)
            .await
            .unwrap();
        if outcome.registration.status == RegistrationStatus::Waitlisted {
            waitlisted.push(outcome.registration.id);
        }
    }
    assert_eq!(waitlisted.len(), 3);

    let outcome = ledger
        .service
        .cancel(&volunteers[0], ledger.opportunity.id)
        .await
        .unwrap();
    assert_eq!(outcome.promoted[0].id, waitlisted[0]);

    let outcome = ledger
        .service
        .cancel(&volunteers[1], ledger.opportunity.id)
        .await
        .unwrap();
    assert_eq!(outcome.promoted[0].id, waitlisted[1]);

    let remaining: Vec<Uuid> = ledger
        .store
        .registrations_for(ledger.opportunity.id)
        .await
        .into_iter()
        .filter(|r| r.status == RegistrationStatus::Waitlisted)
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, vec![waitlisted[2]]);
}

#[tokio::test]
async fn cancelling_a_waitlisted_registration_promotes_nobody() {
    let ledger = TestLedger::new(Some(1), true).await;
    let (a, b, c) = (common::volunteer(), common::volunteer(), common::volunteer());
    for volunteer in [&a, &b, &c] {
        ledger
            .service
            .register(volunteer, ledger.opportunity.id, None)
            .await
            .unwrap();
    }

    let outcome = ledger
        .service
        .cancel(&b, ledger.opportunity.id)
        .await
        .unwrap();

    assert!(outcome.promoted.is_empty());
    assert_eq!(outcome.capacity.current_volunteers, 1);
    assert_eq!(outcome.capacity.waitlist_length, 1);
}

#[tokio::test]
async fn cancelling_on_a_non_full_opportunity_never_promotes() {
    let ledger = TestLedger::new(Some(1), true).await;
    let (a, b) = (common::volunteer(), common::volunteer());

    ledger.service.register(&a, ledger.opportunity.id, None).await.unwrap();
    let waiting = ledger
        .service
        .register(&b, ledger.opportunity.id, None)
        .await
        .unwrap();
    assert_eq!(waiting.registration.status, RegistrationStatus::Waitlisted);

    // capacity raised out of band, so the opportunity is no longer full
    ledger
        .store
        .set_max_volunteers(ledger.opportunity.id, Some(3))
        .await;

    let outcome = ledger
        .service
        .cancel(&a, ledger.opportunity.id)
        .await
        .unwrap();

    assert!(outcome.promoted.is_empty());
    assert_eq!(outcome.capacity.current_volunteers, 0);
    assert_eq!(outcome.capacity.waitlist_length, 1);
}

#[tokio::test]
async fn full_opportunity_without_waitlist_rejects_registration() {
    let ledger = TestLedger::new(Some(1), false).await;

    ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap();
    let rejected = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await;

    assert!(matches!(rejected, Err(RegistrationError::CapacityExceeded)));
    assert_eq!(ledger.store.registrations_for(ledger.opportunity.id).await.len(), 1);
}

#[tokio::test]
async fn unlimited_opportunity_reports_no_limit() {
    let ledger = TestLedger::new(None, false).await;

    let outcome = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap();

    assert_eq!(outcome.capacity.max_volunteers, None);
    assert_eq!(outcome.capacity.spots_remaining, None);
    assert_eq!(outcome.capacity.current_volunteers, 1);
}

#[tokio::test]
async fn concurrent_registrations_never_exceed_capacity() {
    let ledger = TestLedger::new(Some(3), true).await;
    let volunteers: Vec<_> = (0..12).map(|_| common::volunteer()).collect();

    let outcomes = join_all(
        volunteers
            .iter()
            .map(|v| ledger.service.register(v, ledger.opportunity.id, None)),
    )
    .await;

    let statuses: Vec<RegistrationStatus> = outcomes
        .into_iter()
        .map(|o| o.unwrap().registration.status)
        .collect();
    let counted = statuses.iter().filter(|s| s.is_counted()).count();
    let waitlisted = statuses
        .iter()
        .filter(|s| **s == RegistrationStatus::Waitlisted)
        .count();

    assert_eq!(counted, 3);
    assert_eq!(waitlisted, 9);
    assert_eq!(ledger.current_volunteers().await, 3);
}

#[tokio::test]
async fn concurrent_registrations_without_waitlist_fail_fast_when_full() {
    let ledger = TestLedger::new(Some(2), false).await;
    let volunteers: Vec<_> = (0..6).map(|_| common::volunteer()).collect();

    let attempts = volunteers
        .iter()
        .map(|v| ledger.service.register(v, ledger.opportunity.id, None));

    let mut admitted = 0;
    let mut rejected = 0;
    for result in join_all(attempts).await {
        match result {
            Ok(_) => admitted += 1,
            Err(RegistrationError::CapacityExceeded) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((admitted, rejected), (2, 4));
    assert_eq!(ledger.current_volunteers().await, 2);
}

#[tokio::test]
async fn only_published_opportunities_accept_registrations() {
    let mut draft = common::opportunity(Some(5), false);
    draft.status = OpportunityStatus::Draft;
    let ledger = TestLedger::with_opportunity(draft).await;

    let closed = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await;
    assert!(matches!(
        closed,
        Err(RegistrationError::OpportunityClosed(OpportunityStatus::Draft))
    ));

    let missing_id = Uuid::new_v4();
    let missing = ledger
        .service
        .register(&common::volunteer(), missing_id, None)
        .await;
    assert!(matches!(missing, Err(RegistrationError::OpportunityNotFound(id)) if id == missing_id));
}

#[tokio::test]
async fn only_volunteers_may_register() {
    let ledger = TestLedger::new(Some(5), false).await;

    for actor in [common::organizer(), common::admin()] {
        let result = ledger
            .service
            .register(&actor, ledger.opportunity.id, None)
            .await;
        assert!(matches!(result, Err(RegistrationError::Forbidden(_))));
    }
}

#[tokio::test]
async fn cancelling_without_a_registration_fails() {
    let ledger = TestLedger::new(Some(5), false).await;

    let result = ledger
        .service
        .cancel(&common::volunteer(), ledger.opportunity.id)
        .await;

    assert!(matches!(result, Err(RegistrationError::NotRegistered)));
}

#[tokio::test]
async fn negative_hours_are_rejected_and_zero_is_accepted() {
    let ledger = TestLedger::new(Some(5), false).await;
    let registration = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration;

    let negative = ledger
        .service
        .log_hours(&ledger.organizer, registration.id, -1.0)
        .await;
    assert!(matches!(negative, Err(RegistrationError::InvalidHours(h)) if h == -1.0));

    let not_a_number = ledger
        .service
        .log_hours(&ledger.organizer, registration.id, f64::NAN)
        .await;
    assert!(matches!(not_a_number, Err(RegistrationError::InvalidHours(_))));

    let zero = ledger
        .service
        .log_hours(&ledger.organizer, registration.id, 0.0)
        .await
        .unwrap();
    assert_eq!(zero.registration.hours_logged, 0.0);

    let logged = ledger
        .service
        .log_hours(&ledger.organizer, registration.id, 3.5)
        .await
        .unwrap();
    assert_eq!(logged.registration.hours_logged, 3.5);
}

#[tokio::test]
async fn roster_changes_require_membership_in_the_owning_organization() {
    let ledger = TestLedger::new(Some(5), false).await;
    let registration = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration;

    let outsider = common::organizer();
    let denied = ledger.service.confirm(&outsider, registration.id).await;
    assert!(matches!(denied, Err(RegistrationError::Forbidden(_))));

    let member = common::organizer();
    ledger
        .store
        .add_member(member.user_id, ledger.opportunity.organization_id, MemberRole::Member)
        .await;
    let confirmed = ledger.service.confirm(&member, registration.id).await.unwrap();
    assert_eq!(confirmed.registration.status, RegistrationStatus::Confirmed);

    let by_admin = ledger
        .service
        .log_hours(&common::admin(), registration.id, 1.0)
        .await;
    assert!(by_admin.is_ok());

    let by_volunteer = ledger
        .service
        .log_hours(&common::volunteer(), registration.id, 1.0)
        .await;
    assert!(matches!(by_volunteer, Err(RegistrationError::Forbidden(_))));
}

#[tokio::test]
async fn attendance_lifecycle_runs_from_confirmation_to_completion() {
    let ledger = TestLedger::new(Some(2), false).await;
    let volunteer = common::volunteer();
    let organizer = &ledger.organizer;
    let id = ledger
        .service
        .register(&volunteer, ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration
        .id;

    let early_check_in = ledger.service.check_in(organizer, id).await;
    assert!(matches!(
        early_check_in,
        Err(RegistrationError::InvalidTransition {
            from: RegistrationStatus::Pending,
            ..
        })
    ));

    ledger.service.confirm(organizer, id).await.unwrap();

    let early_check_out = ledger.service.check_out(organizer, id).await;
    assert!(matches!(early_check_out, Err(RegistrationError::NotCheckedIn)));

    let checked_in = ledger.service.check_in(organizer, id).await.unwrap();
    assert!(checked_in.registration.checked_in_at.is_some());
    assert!(matches!(
        ledger.service.check_in(organizer, id).await,
        Err(RegistrationError::AlreadyCheckedIn)
    ));

    let checked_out = ledger.service.check_out(organizer, id).await.unwrap();
    assert!(checked_out.registration.checked_out_at.is_some());
    assert!(checked_out.registration.hours_logged >= 0.0);

    let completed = ledger.service.complete(organizer, id).await.unwrap();
    assert_eq!(completed.registration.status, RegistrationStatus::Completed);
    assert_eq!(completed.capacity.current_volunteers, 0);

    let cancel_after_completion = ledger.service.cancel(&volunteer, ledger.opportunity.id).await;
    assert!(matches!(
        cancel_after_completion,
        Err(RegistrationError::InvalidTransition {
            from: RegistrationStatus::Completed,
            action: "cancel"
        })
    ));
}

#[tokio::test]
async fn waitlisted_registrations_cannot_be_confirmed_by_hand() {
    let ledger = TestLedger::new(Some(1), true).await;
    ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap();
    let waiting = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration;

    let result = ledger.service.confirm(&ledger.organizer, waiting.id).await;

    assert!(matches!(
        result,
        Err(RegistrationError::InvalidTransition {
            from: RegistrationStatus::Waitlisted,
            ..
        })
    ));
}

#[tokio::test]
async fn completed_slot_goes_to_the_waitlist_before_a_newcomer() {
    let ledger = TestLedger::new(Some(1), true).await;
    let (a, b, c) = (common::volunteer(), common::volunteer(), common::volunteer());

    let first = ledger
        .service
        .register(&a, ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration;
    let waiting = ledger
        .service
        .register(&b, ledger.opportunity.id, None)
        .await
        .unwrap()
        .registration;
    ledger.service.confirm(&ledger.organizer, first.id).await.unwrap();
    let completed = ledger
        .service
        .complete(&ledger.organizer, first.id)
        .await
        .unwrap();
    assert_eq!(completed.capacity.current_volunteers, 0);

    let newcomer = ledger
        .service
        .register(&c, ledger.opportunity.id, None)
        .await
        .unwrap();

    assert_eq!(newcomer.promoted.len(), 1);
    assert_eq!(newcomer.promoted[0].id, waiting.id);
    assert_eq!(newcomer.promoted[0].status, RegistrationStatus::Confirmed);
    assert_eq!(newcomer.registration.status, RegistrationStatus::Waitlisted);
    assert_eq!(newcomer.capacity.current_volunteers, 1);
    assert_eq!(newcomer.capacity.waitlist_length, 1);
}

#[tokio::test]
async fn newcomers_queue_behind_waitlisted_volunteers_even_with_room() {
    let ledger = TestLedger::new(Some(1), true).await;
    ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap();
    let mut queue = Vec::new();
    for _ in 0..3 {
        let waiting = ledger
            .service
            .register(&common::volunteer(), ledger.opportunity.id, None)
            .await
            .unwrap()
            .registration;
        queue.push(waiting.id);
    }

    // two slots open without anyone being promoted
    ledger
        .store
        .set_max_volunteers(ledger.opportunity.id, Some(3))
        .await;
    let newcomer = ledger
        .service
        .register(&common::volunteer(), ledger.opportunity.id, None)
        .await
        .unwrap();

    let promoted: Vec<Uuid> = newcomer.promoted.iter().map(|r| r.id).collect();
    assert_eq!(promoted, queue[..2].to_vec());
    assert_eq!(newcomer.registration.status, RegistrationStatus::Waitlisted);
    assert_eq!(newcomer.capacity.current_volunteers, 3);
    assert_eq!(newcomer.capacity.waitlist_length, 2);
}

#[tokio::test]
async fn raising_capacity_fills_from_the_waitlist_in_the_same_update() {
    let ledger = TestLedger::new(Some(1), true).await;
    let mut waiting = Vec::new();
    for _ in 0..4 {
        let outcome = ledger
            .service
            .register(&common::volunteer(), ledger.opportunity.id, None)
            .await
            .unwrap();
        if outcome.registration.status == RegistrationStatus::Waitlisted {
            waiting.push(outcome.registration.id);
        }
    }

    let change = ledger
        .service
        .update_opportunity(
            &ledger.organizer,
            ledger.opportunity.id,
            &common::edit_with_capacity(&ledger.opportunity, Some(3)),
        )
        .await
        .unwrap();

    let promoted: Vec<Uuid> = change.promoted.iter().map(|r| r.id).collect();
    assert_eq!(promoted, waiting[..2].to_vec());
    assert_eq!(change.opportunity.max_volunteers, Some(3));
    assert_eq!(change.opportunity.current_volunteers, 3);
    assert_eq!(change.capacity.spots_remaining, Some(0));
    assert_eq!(change.capacity.waitlist_length, 1);

    let stored = ledger.store.opportunity(ledger.opportunity.id).await.unwrap();
    assert_eq!(stored.max_volunteers, Some(3));
    assert_eq!(stored.current_volunteers, 3);
}

#[tokio::test]
async fn capacity_cannot_drop_below_the_current_head_count() {
    let ledger = TestLedger::new(Some(5), false).await;
    for _ in 0..3 {
        ledger
            .service
            .register(&common::volunteer(), ledger.opportunity.id, None)
            .await
            .unwrap();
    }

    let result = ledger
        .service
        .update_opportunity(
            &ledger.organizer,
            ledger.opportunity.id,
            &common::edit_with_capacity(&ledger.opportunity, Some(2)),
        )
        .await;

    assert!(matches!(
        result,
        Err(RegistrationError::CapacityBelowActive { active: 3 })
    ));
    let stored = ledger.store.opportunity(ledger.opportunity.id).await.unwrap();
    assert_eq!(stored.max_volunteers, Some(5));
}

#[tokio::test]
async fn only_owners_and_admins_of_the_organization_edit_postings() {
    let ledger = TestLedger::new(Some(1), true).await;
    let edit = common::edit_with_capacity(&ledger.opportunity, Some(4));

    let member = common::organizer();
    ledger
        .store
        .add_member(member.user_id, ledger.opportunity.organization_id, MemberRole::Member)
        .await;
    let by_member = ledger
        .service
        .update_opportunity(&member, ledger.opportunity.id, &edit)
        .await;
    assert!(matches!(by_member, Err(RegistrationError::Forbidden(_))));

    let by_volunteer = ledger
        .service
        .update_opportunity(&common::volunteer(), ledger.opportunity.id, &edit)
        .await;
    assert!(matches!(by_volunteer, Err(RegistrationError::Forbidden(_))));

    let org_admin = common::organizer();
    ledger
        .store
        .add_member(org_admin.user_id, ledger.opportunity.organization_id, MemberRole::Admin)
        .await;
    let by_org_admin = ledger
        .service
        .update_opportunity(&org_admin, ledger.opportunity.id, &edit)
        .await
        .unwrap();
    assert_eq!(by_org_admin.opportunity.max_volunteers, Some(4));

    let by_platform_admin = ledger
        .service
        .update_opportunity(&common::admin(), ledger.opportunity.id, &edit)
        .await;
    assert!(by_platform_admin.is_ok());
}

#[tokio::test]
async fn schedule_lists_active_registrations_newest_first() {
    let store = MemoryRegistrationStore::new();
    let first = common::opportunity(Some(5), false);
    let second = common::opportunity(Some(5), false);
    let third = common::opportunity(Some(5), false);
    for opportunity in [&first, &second, &third] {
        store.insert_opportunity(opportunity.clone()).await;
    }
    let service = RegistrationService::new(Arc::new(store));
    let volunteer = common::volunteer();

    for opportunity in [&first, &second, &third] {
        service.register(&volunteer, opportunity.id, None).await.unwrap();
    }
    service.cancel(&volunteer, second.id).await.unwrap();

    let schedule: Vec<Uuid> = service
        .schedule(&volunteer)
        .await
        .unwrap()
        .iter()
        .map(|entry: &ScheduleEntry| entry.opportunity.id)
        .collect();

    assert_eq!(schedule, vec![third.id, first.id]);
}

#[tokio::test]
async fn uncommitted_transactions_leave_no_trace() {
    let store = MemoryRegistrationStore::new();
    let opportunity = common::opportunity(Some(5), false);
    store.insert_opportunity(opportunity.clone()).await;

    {
        let mut tx = store.begin().await.unwrap();
        let registration = Registration::new(
            Uuid::new_v4(),
            opportunity.id,
            RegistrationStatus::Pending,
            None,
        );
        tx.insert_registration(&registration).await.unwrap();
        tx.set_current_volunteers(opportunity.id, 1).await.unwrap();
    }

    assert!(store.registrations_for(opportunity.id).await.is_empty());
    assert_eq!(store.opportunity(opportunity.id).await.unwrap().current_volunteers, 0);
}

#[tokio::test]
async fn store_refuses_a_second_active_registration_for_the_same_pair() {
    let store = MemoryRegistrationStore::new();
    let opportunity = common::opportunity(Some(5), false);
    store.insert_opportunity(opportunity.clone()).await;
    let user_id = Uuid::new_v4();

    let mut tx = store.begin().await.unwrap();
    tx.insert_registration(&Registration::new(
        user_id,
        opportunity.id,
        RegistrationStatus::Pending,
        None,
    ))
    .await
    .unwrap();
    let duplicate = tx
        .insert_registration(&Registration::new(
            user_id,
            opportunity.id,
            RegistrationStatus::Waitlisted,
            None,
        ))
        .await;

    assert!(matches!(duplicate, Err(StoreError::UniqueViolation)));
}

/// Store whose first `failures` transactions cannot even start.
struct ContendedStore {
    inner: MemoryRegistrationStore,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl ContendedStore {
    fn new(inner: MemoryRegistrationStore, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RegistrationStore for ContendedStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict("40001".to_string()));
        }
        self.inner.begin().await
    }

    async fn schedule_for_volunteer(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        self.inner.schedule_for_volunteer(user_id).await
    }
}

#[tokio::test]
async fn storage_conflict_is_retried_once() {
    let inner = MemoryRegistrationStore::new();
    let opportunity = common::opportunity(Some(5), false);
    inner.insert_opportunity(opportunity.clone()).await;
    let store = Arc::new(ContendedStore::new(inner, 1));
    let service = RegistrationService::new(store.clone());

    let outcome = service
        .register(&common::volunteer(), opportunity.id, None)
        .await
        .unwrap();

    assert_eq!(outcome.registration.status, RegistrationStatus::Pending);
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn storage_conflict_is_surfaced_after_the_retry() {
    let inner = MemoryRegistrationStore::new();
    let opportunity = common::opportunity(Some(5), false);
    inner.insert_opportunity(opportunity.clone()).await;
    let store = Arc::new(ContendedStore::new(inner.clone(), 2));
    let service = RegistrationService::new(store.clone());

    let result = service
        .register(&common::volunteer(), opportunity.id, None)
        .await;

    assert!(matches!(result, Err(RegistrationError::StorageConflict)));
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert!(inner.registrations_for(opportunity.id).await.is_empty());
}
