use actix_web::{
    HttpResponse, Result,
    web::{Data, Json, Path},
};
use uuid::Uuid;

use crate::{
    database::{
        models::{CreateOrganizationInput, slugify},
        repositories::{OrganizationRepository, ProfileRepository},
    },
    error::AppError,
    handlers::shared::ApiResponse,
    services::{Operation, UserContext},
};

/// Admins pass; everyone else needs a membership in the organization, and
/// an owner/admin membership when `manage` is set.
pub async fn require_membership(
    ctx: &UserContext,
    organizations: &OrganizationRepository,
    organization_id: Uuid,
    manage: bool,
) -> Result<(), AppError> {
    if ctx.is_admin() {
        return Ok(());
    }

    let role = organizations
        .member_role(ctx.user_id, organization_id)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to check membership of user {} in organization {}: {}",
                ctx.user_id,
                organization_id,
                e
            );
            AppError::DatabaseError(e)
        })?;

    match role {
        Some(role) if !manage || role.can_manage_postings() => Ok(()),
        Some(_) => Err(AppError::Forbidden(
            "Only organization owners and admins can manage postings".to_string(),
        )),
        None => Err(AppError::Forbidden(
            "You are not a member of this organization".to_string(),
        )),
    }
}

pub async fn create_organization(
    ctx: UserContext,
    input: Json<CreateOrganizationInput>,
    organizations: Data<OrganizationRepository>,
    profiles: Data<ProfileRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::CreateOrganization)?;

    if input.name.trim().is_empty() || slugify(&input.name).is_empty() {
        return Err(AppError::BadRequest("Organization name is required".to_string()).into());
    }
    if !input.contact_email.contains('@') {
        return Err(AppError::BadRequest("A valid contact email is required".to_string()).into());
    }

    profiles
        .ensure(ctx.user_id, &ctx.email, ctx.role)
        .await
        .map_err(AppError::from)?;

    let organization = organizations.create_with_owner(ctx.user_id, &input).await?;

    log::info!(
        "Organization {} ({}) created by user {}",
        organization.id,
        organization.slug,
        ctx.user_id
    );
    Ok(ApiResponse::created(organization))
}

pub async fn get_my_organization(
    ctx: UserContext,
    organizations: Data<OrganizationRepository>,
) -> Result<HttpResponse> {
    let membership = organizations
        .find_for_member(ctx.user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load organization for user {}: {}", ctx.user_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("You are not a member of any organization".to_string()))?;

    Ok(ApiResponse::success(membership))
}

pub async fn get_members(
    ctx: UserContext,
    path: Path<Uuid>,
    organizations: Data<OrganizationRepository>,
) -> Result<HttpResponse> {
    let organization_id = path.into_inner();
    require_membership(&ctx, &organizations, organization_id, false).await?;

    let members = organizations.members(organization_id).await.map_err(|e| {
        log::error!("Failed to list members of organization {}: {}", organization_id, e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(members))
}

/// Membership with posting rights, resolved for the caller's own organization.
pub async fn managing_membership(
    ctx: &UserContext,
    organizations: &OrganizationRepository,
) -> Result<Uuid, AppError> {
    let membership = organizations
        .find_for_member(ctx.user_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| {
            AppError::Forbidden("Set up your organization before posting opportunities".to_string())
        })?;

    if !membership.role.can_manage_postings() {
        return Err(AppError::Forbidden(
            "Only organization owners and admins can manage postings".to_string(),
        ));
    }

    Ok(membership.organization.id)
}
