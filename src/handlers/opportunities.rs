use actix_web::{
    HttpResponse, Result,
    web::{Data, Json, Path, Query},
};
use uuid::Uuid;

use crate::{
    database::{
        models::{Opportunity, OpportunityInput, OpportunityQuery, UpdateOpportunityStatusInput},
        repositories::{OpportunityRepository, OrganizationRepository},
    },
    error::AppError,
    handlers::{
        organizations::{managing_membership, require_membership},
        shared::ApiResponse,
    },
    services::{Operation, RegistrationService, UserContext},
};

async fn load_opportunity(
    opportunities: &OpportunityRepository,
    opportunity_id: Uuid,
) -> Result<Opportunity, AppError> {
    opportunities
        .find_by_id(opportunity_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load opportunity {}: {}", opportunity_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("Opportunity not found".to_string()))
}

pub async fn list_opportunities(
    _ctx: UserContext,
    query: Query<OpportunityQuery>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    let listings = opportunities.list_published(&query).await.map_err(|e| {
        log::error!("Failed to list opportunities: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(listings))
}

pub async fn get_opportunity(
    _ctx: UserContext,
    path: Path<Uuid>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    let opportunity_id = path.into_inner();
    let listing = opportunities
        .find_listing(opportunity_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load opportunity {}: {}", opportunity_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("Opportunity not found".to_string()))?;

    Ok(ApiResponse::success(listing))
}

pub async fn create_opportunity(
    ctx: UserContext,
    input: Json<OpportunityInput>,
    organizations: Data<OrganizationRepository>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageOpportunities)?;
    let organization_id = managing_membership(&ctx, &organizations).await?;
    input.validate().map_err(AppError::BadRequest)?;

    let opportunity = opportunities
        .create(organization_id, &input)
        .await
        .map_err(|e| {
            log::error!("Failed to create opportunity for {}: {}", organization_id, e);
            AppError::DatabaseError(e)
        })?;

    log::info!(
        "Opportunity {} created by user {} as {}",
        opportunity.id,
        ctx.user_id,
        opportunity.status
    );
    Ok(ApiResponse::created(opportunity))
}

pub async fn update_opportunity(
    ctx: UserContext,
    path: Path<Uuid>,
    input: Json<OpportunityInput>,
    registrations: Data<RegistrationService>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageOpportunities)?;
    input.validate().map_err(AppError::BadRequest)?;

    let change = registrations
        .update_opportunity(&ctx, path.into_inner(), &input)
        .await?;

    Ok(ApiResponse::success(change))
}

pub async fn update_status(
    ctx: UserContext,
    path: Path<Uuid>,
    input: Json<UpdateOpportunityStatusInput>,
    organizations: Data<OrganizationRepository>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageOpportunities)?;
    let opportunity_id = path.into_inner();

    let existing = load_opportunity(&opportunities, opportunity_id).await?;
    require_membership(&ctx, &organizations, existing.organization_id, true).await?;

    if !existing.status.can_transition_to(input.status) {
        return Err(AppError::Conflict(format!(
            "Cannot move an opportunity from {} to {}",
            existing.status, input.status
        ))
        .into());
    }

    let opportunity = opportunities
        .set_status(opportunity_id, input.status)
        .await
        .map_err(|e| {
            log::error!("Failed to update status of opportunity {}: {}", opportunity_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("Opportunity not found".to_string()))?;

    log::info!(
        "Opportunity {} moved from {} to {} by user {}",
        opportunity_id,
        existing.status,
        opportunity.status,
        ctx.user_id
    );
    Ok(ApiResponse::success(opportunity))
}

pub async fn list_my_opportunities(
    ctx: UserContext,
    organizations: Data<OrganizationRepository>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageOpportunities)?;

    let membership = organizations
        .find_for_member(ctx.user_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("You are not a member of any organization".to_string()))?;

    let postings = opportunities
        .list_for_organization(membership.organization.id)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to list opportunities of organization {}: {}",
                membership.organization.id,
                e
            );
            AppError::DatabaseError(e)
        })?;

    Ok(ApiResponse::success(postings))
}

pub async fn get_roster(
    ctx: UserContext,
    path: Path<Uuid>,
    organizations: Data<OrganizationRepository>,
    opportunities: Data<OpportunityRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageRoster)?;
    let opportunity_id = path.into_inner();

    let opportunity = load_opportunity(&opportunities, opportunity_id).await?;
    require_membership(&ctx, &organizations, opportunity.organization_id, false).await?;

    let roster = opportunities.roster(opportunity_id).await.map_err(|e| {
        log::error!("Failed to load roster of opportunity {}: {}", opportunity_id, e);
        AppError::DatabaseError(e)
    })?;

    Ok(ApiResponse::success(roster))
}
