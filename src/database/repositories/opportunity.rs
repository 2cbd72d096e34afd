use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{
        Opportunity, OpportunityInput, OpportunityListing, OpportunityQuery, OpportunityStatus,
        RosterEntry,
    },
    utils::sql,
};

const LISTING_SELECT: &str = r#"
    SELECT
        o.*,
        org.name AS organization_name,
        org.logo_url AS organization_logo_url,
        org.is_verified AS organization_verified
    FROM
        opportunities o
        JOIN organizations org ON org.id = o.organization_id
"#;

#[derive(Clone)]
pub struct OpportunityRepository {
    pool: PgPool,
}

impl OpportunityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        input: &OpportunityInput,
    ) -> Result<Opportunity, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&sql(r#"
                INSERT INTO
                    opportunities (
                        organization_id,
                        title,
                        description,
                        short_description,
                        category,
                        skills_needed,
                        location_type,
                        address,
                        city,
                        start_date,
                        end_date,
                        recurrence,
                        max_volunteers,
                        waitlist_enabled,
                        status,
                        image_url
                    )
                VALUES
                    (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING
                    *
            "#))
        .bind(organization_id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(&input.short_description)
        .bind(&input.category)
        .bind(&input.skills_needed)
        .bind(input.location_type)
        .bind(&input.address)
        .bind(&input.city)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.recurrence)
        .bind(input.max_volunteers)
        .bind(input.waitlist_enabled)
        .bind(input.status)
        .bind(&input.image_url)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_status(
        &self,
        opportunity_id: Uuid,
        status: OpportunityStatus,
    ) -> Result<Option<Opportunity>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&sql(r#"
                UPDATE
                    opportunities
                SET
                    status = ?,
                    updated_at = NOW()
                WHERE
                    id = ?
                RETURNING
                    *
            "#))
        .bind(status)
        .bind(opportunity_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, opportunity_id: Uuid) -> Result<Option<Opportunity>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&sql("SELECT * FROM opportunities WHERE id = ?"))
            .bind(opportunity_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_listing(
        &self,
        opportunity_id: Uuid,
    ) -> Result<Option<OpportunityListing>, sqlx::Error> {
        let query = format!("{LISTING_SELECT} WHERE o.id = ?");

        sqlx::query_as::<_, OpportunityListing>(&sql(&query))
            .bind(opportunity_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Upcoming published postings, soonest first.
    pub async fn list_published(
        &self,
        query: &OpportunityQuery,
    ) -> Result<Vec<OpportunityListing>, sqlx::Error> {
        let statement = format!(
            r#"{LISTING_SELECT}
            WHERE
                o.status = 'published'
                AND o.start_date >= NOW()
                AND (?::text IS NULL OR o.category = ?)
                AND (?::text IS NULL OR o.location_type = ?)
                AND (
                    ?::text IS NULL
                    OR o.title ILIKE ?
                    OR o.description ILIKE ?
                )
            ORDER BY
                o.start_date ASC
            LIMIT ?
            "#
        );
        let category = query.category_filter();
        let search = query.search_pattern();

        sqlx::query_as::<_, OpportunityListing>(&sql(&statement))
            .bind(category)
            .bind(category)
            .bind(query.location)
            .bind(query.location)
            .bind(&search)
            .bind(&search)
            .bind(&search)
            .bind(query.effective_limit())
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Opportunity>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&sql(r#"
                SELECT
                    *
                FROM
                    opportunities
                WHERE
                    organization_id = ?
                ORDER BY
                    start_date DESC
            "#))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Every registration for the posting with who the volunteer is, oldest first.
    pub async fn roster(&self, opportunity_id: Uuid) -> Result<Vec<RosterEntry>, sqlx::Error> {
        sqlx::query_as::<_, RosterEntry>(&sql(r#"
                SELECT
                    r.id,
                    r.user_id,
                    r.opportunity_id,
                    r.status,
                    r.hours_logged,
                    r.notes,
                    r.checked_in_at,
                    r.checked_out_at,
                    r.created_at,
                    r.updated_at,
                    p.email AS volunteer_email,
                    p.full_name AS volunteer_name,
                    p.phone AS volunteer_phone
                FROM
                    registrations r
                    LEFT JOIN profiles p ON p.id = r.user_id
                WHERE
                    r.opportunity_id = ?
                ORDER BY
                    r.created_at ASC
            "#))
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await
    }
}
