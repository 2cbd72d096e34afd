use actix_web::{
    HttpResponse, Result,
    web::{Data, Json, Path, Query},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Organization, ProfileQuery, ProfileSummary, RoleCounts, VerificationCounts,
            VerificationFilter,
        },
        repositories::{OrganizationRepository, ProfileRepository, StatsRepository},
    },
    error::AppError,
    handlers::shared::ApiResponse,
    services::UserContext,
};

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationListQuery {
    #[serde(default)]
    pub status: VerificationFilter,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOrganizationInput {
    pub verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationList {
    pub organizations: Vec<Organization>,
    pub counts: VerificationCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    pub users: Vec<ProfileSummary>,
    pub counts: RoleCounts,
}

pub async fn get_platform_stats(
    ctx: UserContext,
    stats: Data<StatsRepository>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;

    let platform = stats.platform_stats().await.map_err(|e| {
        log::error!("Error fetching platform stats: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(platform))
}

pub async fn list_organizations(
    ctx: UserContext,
    query: Query<OrganizationListQuery>,
    organizations: Data<OrganizationRepository>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;

    let list = organizations.list(query.status).await.map_err(|e| {
        log::error!("Error listing organizations: {}", e);
        AppError::DatabaseError(e)
    })?;
    let counts = organizations.verification_counts().await.map_err(|e| {
        log::error!("Error counting organizations: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(OrganizationList {
        organizations: list,
        counts,
    }))
}

pub async fn verify_organization(
    ctx: UserContext,
    path: Path<Uuid>,
    input: Json<VerifyOrganizationInput>,
    organizations: Data<OrganizationRepository>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;
    let organization_id = path.into_inner();

    let organization = organizations
        .set_verified(organization_id, input.verified)
        .await
        .map_err(|e| {
            log::error!("Error verifying organization {}: {}", organization_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    log::info!(
        "Organization {} marked {} by admin {}",
        organization_id,
        if organization.is_verified { "verified" } else { "unverified" },
        ctx.user_id
    );

    let message = if organization.is_verified {
        "Organization verified"
    } else {
        "Organization verification revoked"
    };
    Ok(ApiResponse::success_with_message(organization, message))
}

pub async fn list_users(
    ctx: UserContext,
    query: Query<ProfileQuery>,
    profiles: Data<ProfileRepository>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;

    let users = profiles.list(&query).await.map_err(|e| {
        log::error!("Error listing users: {}", e);
        AppError::DatabaseError(e)
    })?;
    let counts = profiles.count_by_role().await.map_err(|e| {
        log::error!("Error counting users by role: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(UserList { users, counts }))
}
