use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: i64,
    pub volunteers: i64,
    pub organization_users: i64,
    pub admins: i64,
    pub total_organizations: i64,
    pub verified_organizations: i64,
    pub total_opportunities: i64,
    pub published_opportunities: i64,
    pub total_registrations: i64,
    pub confirmed_registrations: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerStats {
    pub hours_logged: f64,
    pub events_attended: i64,
    pub organizations_served: i64,
    pub upcoming_registrations: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStats {
    pub active_volunteers: i64,
    pub open_opportunities: i64,
    pub total_hours: f64,
    /// Percentage of finished registrations that were completed rather than cancelled.
    pub completion_rate: f64,
}

impl OrganizationStats {
    pub fn completion_rate(completed: i64, cancelled: i64) -> f64 {
        let finished = completed + cancelled;
        if finished > 0 {
            (completed as f64 / finished as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Dashboard payload, shaped by the caller's role.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", content = "stats", rename_all = "lowercase")]
pub enum DashboardStats {
    Volunteer(VolunteerStats),
    Organization(OrganizationStats),
    Admin(PlatformStats),
}
