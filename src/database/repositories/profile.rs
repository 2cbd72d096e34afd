use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{Profile, ProfileQuery, ProfileSummary, RoleCounts, UpdateProfileInput, UserRole},
    utils::sql,
};

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&sql("SELECT * FROM profiles WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Provisions the profile for an identity on first sight, keeping email
    /// and role in step with what the identity provider asserts.
    pub async fn ensure(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&sql(r#"
                INSERT INTO
                    profiles (id, email, role)
                VALUES
                    (?, ?, ?)
                ON CONFLICT (id) DO UPDATE
                SET
                    email = EXCLUDED.email,
                    role = EXCLUDED.role,
                    updated_at = CASE
                        WHEN profiles.email = EXCLUDED.email AND profiles.role = EXCLUDED.role
                        THEN profiles.updated_at
                        ELSE NOW()
                    END
                RETURNING
                    *
            "#))
        .bind(user_id)
        .bind(email)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        input: &UpdateProfileInput,
    ) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&sql(r#"
                UPDATE
                    profiles
                SET
                    full_name = COALESCE(?, full_name),
                    avatar_url = COALESCE(?, avatar_url),
                    phone = COALESCE(?, phone),
                    bio = COALESCE(?, bio),
                    skills = COALESCE(?, skills),
                    languages = COALESCE(?, languages),
                    updated_at = NOW()
                WHERE
                    id = ?
                RETURNING
                    *
            "#))
        .bind(&input.full_name)
        .bind(&input.avatar_url)
        .bind(&input.phone)
        .bind(&input.bio)
        .bind(&input.skills)
        .bind(&input.languages)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(&self, query: &ProfileQuery) -> Result<Vec<ProfileSummary>, sqlx::Error> {
        sqlx::query_as::<_, ProfileSummary>(&sql(r#"
                SELECT
                    id,
                    email,
                    full_name,
                    role,
                    phone,
                    created_at
                FROM
                    profiles
                WHERE
                    (?::text IS NULL OR role = ?)
                    AND (
                        ?::text IS NULL
                        OR full_name ILIKE ?
                        OR email ILIKE ?
                    )
                ORDER BY
                    created_at DESC
                LIMIT ?
            "#))
        .bind(query.role)
        .bind(query.role)
        .bind(query.search_pattern())
        .bind(query.search_pattern())
        .bind(query.search_pattern())
        .bind(query.effective_limit())
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_by_role(&self) -> Result<RoleCounts, sqlx::Error> {
        let (volunteers, organizations, admins) = sqlx::query_as::<_, (i64, i64, i64)>(r#"
                SELECT
                    COUNT(*) FILTER (WHERE role = 'volunteer'),
                    COUNT(*) FILTER (WHERE role = 'organization'),
                    COUNT(*) FILTER (WHERE role = 'admin')
                FROM
                    profiles
            "#)
        .fetch_one(&self.pool)
        .await?;

        Ok(RoleCounts {
            volunteers,
            organizations,
            admins,
        })
    }
}
