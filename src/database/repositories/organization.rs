use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{
        CreateOrganizationInput, MemberInfo, MemberRole, Organization, OrganizationMembership,
        VerificationCounts, VerificationFilter, slugify,
    },
    transaction::DatabaseTransaction,
    utils::sql,
};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct MembershipRow {
    #[sqlx(flatten)]
    organization: Organization,
    member_role: MemberRole,
}

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the organization and makes `owner_id` its owner in one transaction.
    pub async fn create_with_owner(
        &self,
        owner_id: Uuid,
        input: &CreateOrganizationInput,
    ) -> Result<Organization, AppError> {
        let input = input.clone();
        let slug = slugify(&input.name);

        let result = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                let organization = sqlx::query_as::<_, Organization>(&sql(r#"
                        INSERT INTO
                            organizations (
                                name,
                                slug,
                                description,
                                contact_email,
                                website,
                                logo_url,
                                address,
                                city
                            )
                        VALUES
                            (?, ?, ?, ?, ?, ?, ?, ?)
                        RETURNING
                            *
                    "#))
                .bind(input.name.trim())
                .bind(&slug)
                .bind(&input.description)
                .bind(input.contact_email.trim())
                .bind(&input.website)
                .bind(&input.logo_url)
                .bind(&input.address)
                .bind(&input.city)
                .fetch_one(&mut **tx)
                .await?;

                sqlx::query(&sql(r#"
                        INSERT INTO
                            organization_members (user_id, organization_id, role)
                        VALUES
                            (?, ?, ?)
                    "#))
                .bind(owner_id)
                .bind(organization.id)
                .bind(MemberRole::Owner)
                .execute(&mut **tx)
                .await?;

                Ok(organization)
            })
        })
        .await;

        match result {
            Err(AppError::DatabaseError(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(AppError::Conflict(
                    "An organization with this name already exists".to_string(),
                ))
            }
            other => other,
        }
    }

    pub async fn find_by_id(&self, organization_id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(&sql("SELECT * FROM organizations WHERE id = ?"))
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// The caller's organization; the oldest membership wins if there are several.
    pub async fn find_for_member(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMembership>, sqlx::Error> {
        let row = sqlx::query_as::<_, MembershipRow>(&sql(r#"
                SELECT
                    o.*,
                    m.role AS member_role
                FROM
                    organization_members m
                    JOIN organizations o ON o.id = m.organization_id
                WHERE
                    m.user_id = ?
                ORDER BY
                    m.created_at ASC
                LIMIT 1
            "#))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| OrganizationMembership {
            organization: row.organization,
            role: row.member_role,
        }))
    }

    pub async fn member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MemberRole>, sqlx::Error> {
        sqlx::query_scalar::<_, MemberRole>(&sql(r#"
                SELECT
                    role
                FROM
                    organization_members
                WHERE
                    user_id = ?
                    AND organization_id = ?
            "#))
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn members(&self, organization_id: Uuid) -> Result<Vec<MemberInfo>, sqlx::Error> {
        sqlx::query_as::<_, MemberInfo>(&sql(r#"
                SELECT
                    m.user_id,
                    p.email,
                    p.full_name,
                    m.role,
                    m.created_at
                FROM
                    organization_members m
                    JOIN profiles p ON p.id = m.user_id
                WHERE
                    m.organization_id = ?
                ORDER BY
                    m.created_at ASC
            "#))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list(&self, filter: VerificationFilter) -> Result<Vec<Organization>, sqlx::Error> {
        let verified = filter.as_flag();

        sqlx::query_as::<_, Organization>(&sql(r#"
                SELECT
                    *
                FROM
                    organizations
                WHERE
                    ?::boolean IS NULL
                    OR is_verified = ?
                ORDER BY
                    created_at DESC
            "#))
        .bind(verified)
        .bind(verified)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn verification_counts(&self) -> Result<VerificationCounts, sqlx::Error> {
        let (total, verified) = sqlx::query_as::<_, (i64, i64)>(r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE is_verified)
                FROM
                    organizations
            "#)
        .fetch_one(&self.pool)
        .await?;

        Ok(VerificationCounts {
            total,
            verified,
            pending: total - verified,
        })
    }

    pub async fn set_verified(
        &self,
        organization_id: Uuid,
        verified: bool,
    ) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(&sql(r#"
                UPDATE
                    organizations
                SET
                    is_verified = ?,
                    updated_at = NOW()
                WHERE
                    id = ?
                RETURNING
                    *
            "#))
        .bind(verified)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }
}
