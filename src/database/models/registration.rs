use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, opportunity::Opportunity};

string_enum! {
    pub enum RegistrationStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Waitlisted => "waitlisted",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        RegistrationStatus::Pending
    }
}

impl RegistrationStatus {
    /// Statuses that occupy a slot and make up `current_volunteers`.
    pub const COUNTED: &'static [RegistrationStatus] =
        &[RegistrationStatus::Pending, RegistrationStatus::Confirmed];

    pub fn is_counted(&self) -> bool {
        Self::COUNTED.contains(self)
    }

    /// Anything but `cancelled` blocks a second registration for the same pair.
    pub fn is_active(&self) -> bool {
        *self != RegistrationStatus::Cancelled
    }

    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Waitlisted, Confirmed)
                | (Waitlisted, Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub opportunity_id: Uuid,
    pub status: RegistrationStatus,
    pub hours_logged: f64,
    pub notes: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        user_id: Uuid,
        opportunity_id: Uuid,
        status: RegistrationStatus,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            opportunity_id,
            status,
            hours_logged: 0.0,
            notes,
            checked_in_at: None,
            checked_out_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the record moved to `next`, or `None` if the lifecycle forbids it.
    pub fn transitioned(&self, next: RegistrationStatus) -> Option<Registration> {
        if !self.status.can_transition_to(next) {
            return None;
        }
        Some(Registration {
            status: next,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogHoursInput {
    pub hours: f64,
}

/// A volunteer's registration with the opportunity it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub registration: Registration,
    pub opportunity: Opportunity,
}

/// Roster line for an organization: registration plus who the volunteer is.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub registration: Registration,
    pub volunteer_email: Option<String>,
    pub volunteer_name: Option<String>,
    pub volunteer_phone: Option<String>,
}
