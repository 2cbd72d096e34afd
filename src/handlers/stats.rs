use actix_web::{HttpResponse, Result, web::Data};

use crate::{
    database::{
        models::{DashboardStats, OrganizationStats, UserRole},
        repositories::{OrganizationRepository, StatsRepository},
    },
    error::AppError,
    handlers::shared::ApiResponse,
    services::UserContext,
};

/// Dashboard numbers for whoever is asking: volunteers see their own
/// activity, organizers their organization's, admins the whole platform.
pub async fn get_dashboard_stats(
    ctx: UserContext,
    stats: Data<StatsRepository>,
    organizations: Data<OrganizationRepository>,
) -> Result<HttpResponse> {
    let dashboard = match ctx.role {
        UserRole::Volunteer => DashboardStats::Volunteer(
            stats
                .volunteer_stats(ctx.user_id)
                .await
                .map_err(|e| {
                    log::error!("Error fetching volunteer stats for {}: {}", ctx.user_id, e);
                    AppError::DatabaseError(e)
                })?,
        ),
        UserRole::Organization => {
            let membership = organizations
                .find_for_member(ctx.user_id)
                .await
                .map_err(AppError::from)?;

            let organization_stats = match membership {
                Some(membership) => stats
                    .organization_stats(membership.organization.id)
                    .await
                    .map_err(|e| {
                        log::error!(
                            "Error fetching stats for organization {}: {}",
                            membership.organization.id,
                            e
                        );
                        AppError::DatabaseError(e)
                    })?,
                None => OrganizationStats::default(),
            };
            DashboardStats::Organization(organization_stats)
        }
        UserRole::Admin => DashboardStats::Admin(stats.platform_stats().await.map_err(|e| {
            log::error!("Error fetching platform stats: {}", e);
            AppError::DatabaseError(e)
        })?),
    };

    Ok(ApiResponse::success(dashboard))
}
