use uuid::Uuid;

use crate::database::models::{Registration, RegistrationStatus};
use crate::database::store::{StoreError, StoreTransaction};
use crate::services::capacity;

/// Moves the earliest waitlisted registration to `confirmed` if a slot is free.
///
/// Must run inside the transaction that holds the opportunity lock. Returns
/// `None` when nobody is waiting or the opportunity is still full.
pub async fn promote_next(
    tx: &mut dyn StoreTransaction,
    opportunity_id: Uuid,
    max_volunteers: Option<i32>,
) -> Result<Option<Registration>, StoreError> {
    let counted = tx
        .count_registrations(opportunity_id, RegistrationStatus::COUNTED)
        .await?;
    if !capacity::has_room(max_volunteers, counted) {
        return Ok(None);
    }

    let Some(next) = tx.earliest_waitlisted(opportunity_id).await? else {
        return Ok(None);
    };
    let Some(confirmed) = next.transitioned(RegistrationStatus::Confirmed) else {
        return Ok(None);
    };

    let promoted = tx.update_registration(&confirmed).await?;
    log::info!(
        "Promoted registration {} (user {}) from the waitlist of opportunity {}",
        promoted.id,
        promoted.user_id,
        opportunity_id
    );

    Ok(Some(promoted))
}

/// Promotes waitlisted registrations until the opportunity is full again.
pub async fn fill_open_slots(
    tx: &mut dyn StoreTransaction,
    opportunity_id: Uuid,
    max_volunteers: Option<i32>,
) -> Result<Vec<Registration>, StoreError> {
    let mut promoted = Vec::new();
    while let Some(registration) = promote_next(tx, opportunity_id, max_volunteers).await? {
        promoted.push(registration);
    }
    Ok(promoted)
}
