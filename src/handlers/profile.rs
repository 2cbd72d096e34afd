use actix_web::{
    HttpResponse, Result,
    web::{Data, Json},
};

use crate::{
    database::{models::UpdateProfileInput, repositories::ProfileRepository},
    error::AppError,
    handlers::shared::ApiResponse,
    services::{Operation, UserContext},
};

pub async fn get_profile(
    ctx: UserContext,
    profiles: Data<ProfileRepository>,
) -> Result<HttpResponse> {
    let profile = profiles
        .ensure(ctx.user_id, &ctx.email, ctx.role)
        .await
        .map_err(|e| {
            log::error!("Failed to load profile for user {}: {}", ctx.user_id, e);
            AppError::DatabaseError(e)
        })?;

    Ok(ApiResponse::success(profile))
}

pub async fn update_profile(
    ctx: UserContext,
    input: Json<UpdateProfileInput>,
    profiles: Data<ProfileRepository>,
) -> Result<HttpResponse> {
    ctx.authorize(Operation::ManageProfile)?;

    profiles
        .ensure(ctx.user_id, &ctx.email, ctx.role)
        .await
        .map_err(|e| {
            log::error!("Failed to provision profile for user {}: {}", ctx.user_id, e);
            AppError::DatabaseError(e)
        })?;

    let profile = profiles
        .update(ctx.user_id, &input)
        .await
        .map_err(|e| {
            log::error!("Failed to update profile for user {}: {}", ctx.user_id, e);
            AppError::DatabaseError(e)
        })?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    log::info!("Profile updated for user {}", ctx.user_id);
    Ok(ApiResponse::success_with_message(profile, "Profile updated"))
}
