use actix_web::{
    HttpResponse, Result,
    web::{Data, Json, Path},
};
use uuid::Uuid;

use crate::{
    database::models::{LogHoursInput, RegisterInput},
    handlers::shared::ApiResponse,
    services::{RegistrationService, UserContext},
};

pub async fn register(
    ctx: UserContext,
    path: Path<Uuid>,
    body: Option<Json<RegisterInput>>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let opportunity_id = path.into_inner();
    let notes = body.and_then(|b| b.into_inner().notes);

    let outcome = service.register(&ctx, opportunity_id, notes).await?;

    let message = if outcome.registration.status.is_counted() {
        "Successfully registered"
    } else {
        "Added to the waitlist"
    };
    Ok(ApiResponse::created_with_message(outcome, message))
}

pub async fn cancel(
    ctx: UserContext,
    path: Path<Uuid>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service.cancel(&ctx, path.into_inner()).await?;

    let message = if outcome.promoted.is_empty() {
        "Registration cancelled"
    } else {
        "Registration cancelled; the next volunteer on the waitlist was confirmed"
    };
    Ok(ApiResponse::success_with_message(outcome, message))
}

pub async fn my_registrations(
    ctx: UserContext,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let schedule = service.schedule(&ctx).await?;
    Ok(ApiResponse::success(schedule))
}

pub async fn confirm(
    ctx: UserContext,
    path: Path<Uuid>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service.confirm(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::success_with_message(outcome, "Registration confirmed"))
}

pub async fn check_in(
    ctx: UserContext,
    path: Path<Uuid>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service.check_in(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::success_with_message(outcome, "Volunteer checked in"))
}

pub async fn check_out(
    ctx: UserContext,
    path: Path<Uuid>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service.check_out(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::success_with_message(outcome, "Volunteer checked out"))
}

pub async fn complete(
    ctx: UserContext,
    path: Path<Uuid>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service.complete(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::success_with_message(outcome, "Registration completed"))
}

pub async fn log_hours(
    ctx: UserContext,
    path: Path<Uuid>,
    input: Json<LogHoursInput>,
    service: Data<RegistrationService>,
) -> Result<HttpResponse> {
    let outcome = service
        .log_hours(&ctx, path.into_inner(), input.hours)
        .await?;
    Ok(ApiResponse::success_with_message(outcome, "Hours logged"))
}
