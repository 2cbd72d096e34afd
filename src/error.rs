use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{OpportunityStatus, RegistrationStatus};
use crate::database::store::StoreError;
use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_envelope(self.status_code(), &self.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl AppError {
    pub fn internal_server_error_message(message: impl Into<String>) -> Self {
        AppError::InternalServerError(Some(message.into()))
    }

    pub fn internal_server_error() -> Self {
        AppError::InternalServerError(None)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        match error.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => AppError::DatabaseError(sqlx_err),
            Err(original_error) => AppError::InternalServerError(Some(original_error.to_string())),
        }
    }
}

/// Failures of the registration ledger, capacity tracker and waitlist promoter.
///
/// Each one is scoped to the request that produced it and is rendered as a
/// readable message for the volunteer or organizer.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("You are already registered for this opportunity")]
    AlreadyRegistered,

    #[error("You are not registered for this opportunity")]
    NotRegistered,

    #[error("No spots available for this opportunity")]
    CapacityExceeded,

    #[error("Hours logged must be a non-negative number, got {0}")]
    InvalidHours(f64),

    #[error("The opportunity was modified concurrently, please try again")]
    StorageConflict,

    #[error("Opportunity {0} not found")]
    OpportunityNotFound(Uuid),

    #[error("Registration {0} not found")]
    RegistrationNotFound(Uuid),

    #[error("This opportunity is {0} and is not accepting registrations")]
    OpportunityClosed(OpportunityStatus),

    #[error("Cannot {action} a registration that is {from}")]
    InvalidTransition {
        from: RegistrationStatus,
        action: &'static str,
    },

    #[error("This volunteer has already checked in")]
    AlreadyCheckedIn,

    #[error("This volunteer has not checked in yet")]
    NotCheckedIn,

    #[error("Max volunteers cannot be lower than the {active} volunteers already registered")]
    CapacityBelowActive { active: i64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl ResponseError for RegistrationError {
    fn status_code(&self) -> StatusCode {
        match self {
            RegistrationError::AlreadyRegistered
            | RegistrationError::CapacityExceeded
            | RegistrationError::StorageConflict
            | RegistrationError::OpportunityClosed(_)
            | RegistrationError::InvalidTransition { .. }
            | RegistrationError::AlreadyCheckedIn
            | RegistrationError::NotCheckedIn
            | RegistrationError::CapacityBelowActive { .. } => StatusCode::CONFLICT,
            RegistrationError::NotRegistered
            | RegistrationError::OpportunityNotFound(_)
            | RegistrationError::RegistrationNotFound(_) => StatusCode::NOT_FOUND,
            RegistrationError::InvalidHours(_) => StatusCode::BAD_REQUEST,
            RegistrationError::Forbidden(_) => StatusCode::FORBIDDEN,
            RegistrationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_envelope(self.status_code(), &self.to_string())
    }
}

impl From<StoreError> for RegistrationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation => RegistrationError::AlreadyRegistered,
            StoreError::Conflict(reason) => {
                log::warn!("Storage conflict: {}", reason);
                RegistrationError::StorageConflict
            }
            StoreError::Database(e) => {
                log::error!("Database error: {}", e);
                RegistrationError::Database(e)
            }
        }
    }
}

fn error_envelope(status_code: StatusCode, message: &str) -> HttpResponse {
    if status_code.is_server_error() {
        log::error!("Request failed with status {}: {}", status_code, message);
    } else {
        log::warn!("Request failed with status {}: {}", status_code, message);
    }

    HttpResponse::build(status_code).json(ApiResponse::<()>::error(message))
}
