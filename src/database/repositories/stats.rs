use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{OrganizationStats, PlatformStats, VolunteerStats},
    utils::sql,
};

#[derive(sqlx::FromRow)]
struct OrganizationTotals {
    active_volunteers: i64,
    open_opportunities: i64,
    total_hours: f64,
    completed: i64,
    cancelled: i64,
}

#[derive(Clone)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn platform_stats(&self) -> Result<PlatformStats, sqlx::Error> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64, i64, i64, i64)>(r#"
                SELECT
                    (SELECT COUNT(*) FROM profiles),
                    (SELECT COUNT(*) FROM profiles WHERE role = 'volunteer'),
                    (SELECT COUNT(*) FROM profiles WHERE role = 'organization'),
                    (SELECT COUNT(*) FROM profiles WHERE role = 'admin'),
                    (SELECT COUNT(*) FROM organizations),
                    (SELECT COUNT(*) FROM organizations WHERE is_verified),
                    (SELECT COUNT(*) FROM opportunities),
                    (SELECT COUNT(*) FROM opportunities WHERE status = 'published'),
                    (SELECT COUNT(*) FROM registrations),
                    (SELECT COUNT(*) FROM registrations WHERE status = 'confirmed')
            "#)
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            total_users: row.0,
            volunteers: row.1,
            organization_users: row.2,
            admins: row.3,
            total_organizations: row.4,
            verified_organizations: row.5,
            total_opportunities: row.6,
            published_opportunities: row.7,
            total_registrations: row.8,
            confirmed_registrations: row.9,
        })
    }

    pub async fn volunteer_stats(&self, user_id: Uuid) -> Result<VolunteerStats, sqlx::Error> {
        let (hours_logged, events_attended, organizations_served, upcoming_registrations) =
            sqlx::query_as::<_, (f64, i64, i64, i64)>(&sql(r#"
                SELECT
                    COALESCE(SUM(r.hours_logged) FILTER (WHERE r.status <> 'cancelled'), 0)::float8,
                    COUNT(*) FILTER (WHERE r.status = 'completed'),
                    COUNT(DISTINCT o.organization_id) FILTER (WHERE r.status = 'completed'),
                    COUNT(*) FILTER (
                        WHERE r.status IN ('pending', 'confirmed', 'waitlisted')
                        AND o.start_date >= NOW()
                    )
                FROM
                    registrations r
                    JOIN opportunities o ON o.id = r.opportunity_id
                WHERE
                    r.user_id = ?
            "#))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(VolunteerStats {
            hours_logged,
            events_attended,
            organizations_served,
            upcoming_registrations,
        })
    }

    pub async fn organization_stats(
        &self,
        organization_id: Uuid,
    ) -> Result<OrganizationStats, sqlx::Error> {
        let totals = sqlx::query_as::<_, OrganizationTotals>(&sql(r#"
                SELECT
                    (
                        SELECT COUNT(DISTINCT r.user_id)
                        FROM registrations r
                        JOIN opportunities o ON o.id = r.opportunity_id
                        WHERE o.organization_id = ?
                        AND r.status IN ('pending', 'confirmed')
                    ) AS active_volunteers,
                    (
                        SELECT COUNT(*)
                        FROM opportunities
                        WHERE organization_id = ?
                        AND status = 'published'
                    ) AS open_opportunities,
                    (
                        SELECT COALESCE(SUM(r.hours_logged), 0)::float8
                        FROM registrations r
                        JOIN opportunities o ON o.id = r.opportunity_id
                        WHERE o.organization_id = ?
                        AND r.status <> 'cancelled'
                    ) AS total_hours,
                    (
                        SELECT COUNT(*)
                        FROM registrations r
                        JOIN opportunities o ON o.id = r.opportunity_id
                        WHERE o.organization_id = ?
                        AND r.status = 'completed'
                    ) AS completed,
                    (
                        SELECT COUNT(*)
                        FROM registrations r
                        JOIN opportunities o ON o.id = r.opportunity_id
                        WHERE o.organization_id = ?
                        AND r.status = 'cancelled'
                    ) AS cancelled
            "#))
        .bind(organization_id)
        .bind(organization_id)
        .bind(organization_id)
        .bind(organization_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrganizationStats {
            active_volunteers: totals.active_volunteers,
            open_opportunities: totals.open_opportunities,
            total_hours: totals.total_hours,
            completion_rate: OrganizationStats::completion_rate(totals.completed, totals.cancelled),
        })
    }
}
