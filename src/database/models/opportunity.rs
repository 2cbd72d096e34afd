use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    pub enum OpportunityStatus {
        Draft => "draft",
        Published => "published",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl Default for OpportunityStatus {
    fn default() -> Self {
        OpportunityStatus::Draft
    }
}

impl OpportunityStatus {
    /// Lifecycle of a posting: drafts get published, published postings end
    /// up cancelled or completed. Terminal states stay terminal.
    pub fn can_transition_to(&self, next: OpportunityStatus) -> bool {
        use OpportunityStatus::*;
        matches!(
            (self, next),
            (Draft, Published) | (Draft, Cancelled) | (Published, Cancelled) | (Published, Completed)
        )
    }
}

string_enum! {
    pub enum LocationType {
        InPerson => "in-person",
        Remote => "remote",
        Hybrid => "hybrid",
    }
}

impl Default for LocationType {
    fn default() -> Self {
        LocationType::InPerson
    }
}

string_enum! {
    pub enum Recurrence {
        OneTime => "one-time",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
    }
}

impl Default for Recurrence {
    fn default() -> Self {
        Recurrence::OneTime
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: String,
    pub skills_needed: Vec<String>,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub recurrence: Recurrence,
    pub max_volunteers: Option<i32>,
    pub current_volunteers: i32,
    pub waitlist_enabled: bool,
    pub status: OpportunityStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityInput {
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub skills_needed: Vec<String>,
    #[serde(default)]
    pub location_type: LocationType,
    pub address: Option<String>,
    pub city: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub max_volunteers: Option<i32>,
    #[serde(default)]
    pub waitlist_enabled: bool,
    #[serde(default)]
    pub status: OpportunityStatus,
    pub image_url: Option<String>,
}

impl OpportunityInput {
    /// Field-level checks shared by create and update.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("Description is required".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("Please select a category".to_string());
        }
        if let Some(max) = self.max_volunteers {
            if max < 1 {
                return Err("Max volunteers must be at least 1".to_string());
            }
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err("End date must be after the start date".to_string());
            }
        }
        if matches!(
            self.status,
            OpportunityStatus::Cancelled | OpportunityStatus::Completed
        ) {
            return Err("New postings must be draft or published".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOpportunityStatusInput {
    pub status: OpportunityStatus,
}

/// Browse filters for published opportunities.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityQuery {
    pub category: Option<String>,
    pub location: Option<LocationType>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl OpportunityQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// "All" is the catch-all category in the browse UI.
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
    }

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Published opportunity joined with its organization for the browse page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub organization_name: String,
    pub organization_logo_url: Option<String>,
    pub organization_verified: bool,
}
