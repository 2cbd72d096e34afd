use actix_web::{Error as ActixError, FromRequest, HttpRequest, dev::Payload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::database::models::UserRole;
use crate::error::AppError;
use crate::services::auth::Claims;

/// Capabilities checked at the single entry point of each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Cancel,
    ViewSchedule,
    ManageProfile,
    CreateOrganization,
    ManageOpportunities,
    ManageRoster,
    Administer,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Operation::Register => "register for opportunities",
            Operation::Cancel => "cancel registrations",
            Operation::ViewSchedule => "view a volunteer schedule",
            Operation::ManageProfile => "edit a profile",
            Operation::CreateOrganization => "create organizations",
            Operation::ManageOpportunities => "manage opportunities",
            Operation::ManageRoster => "manage registrations",
            Operation::Administer => "use the admin console",
        };
        f.write_str(action)
    }
}

/// The authenticated caller, built from the bearer token on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl UserContext {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn from_claims(claims: &Claims) -> Self {
        Self::new(claims.sub, claims.email.clone(), claims.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_volunteer(&self) -> bool {
        self.role == UserRole::Volunteer
    }

    pub fn is_organization(&self) -> bool {
        self.role == UserRole::Organization
    }

    pub fn can(&self, operation: Operation) -> bool {
        match operation {
            Operation::Register => self.is_volunteer(),
            Operation::Cancel | Operation::ViewSchedule | Operation::ManageProfile => true,
            Operation::CreateOrganization
            | Operation::ManageOpportunities
            | Operation::ManageRoster => self.is_organization() || self.is_admin(),
            Operation::Administer => self.is_admin(),
        }
    }

    /// Same gate as [`UserContext::authorize`], leaving the error type to the caller.
    pub fn check(&self, operation: Operation) -> Result<(), String> {
        if self.can(operation) {
            return Ok(());
        }

        log::warn!(
            "User {} ({}) attempted to {} without permission",
            self.user_id,
            self.role,
            operation
        );
        Err(format!("{} accounts cannot {}", self.role, operation))
    }

    pub fn authorize(&self, operation: Operation) -> Result<(), AppError> {
        self.check(operation).map_err(AppError::Forbidden)
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        self.authorize(Operation::Administer)
    }
}

impl FromRequest for UserContext {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let claims = Claims::from_request(req, payload).into_inner();
        ready(claims.map(|claims| UserContext::from_claims(&claims)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole) -> UserContext {
        UserContext::new(Uuid::new_v4(), "someone@example.org", role)
    }

    #[test]
    fn only_volunteers_register() {
        assert!(context(UserRole::Volunteer).can(Operation::Register));
        assert!(!context(UserRole::Organization).can(Operation::Register));
        assert!(!context(UserRole::Admin).can(Operation::Register));
    }

    #[test]
    fn roster_is_for_organizations_and_admins() {
        assert!(!context(UserRole::Volunteer).can(Operation::ManageRoster));
        assert!(context(UserRole::Organization).can(Operation::ManageRoster));
        assert!(context(UserRole::Admin).can(Operation::ManageRoster));
    }

    #[test]
    fn forbidden_message_names_role_and_action() {
        let error = context(UserRole::Organization)
            .authorize(Operation::Register)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Forbidden: organization accounts cannot register for opportunities"
        );
    }

    #[test]
    fn check_reports_the_denial_without_choosing_an_error_type() {
        assert_eq!(context(UserRole::Volunteer).check(Operation::Register), Ok(()));
        assert_eq!(
            context(UserRole::Volunteer).check(Operation::ManageRoster),
            Err("volunteer accounts cannot manage registrations".to_string())
        );
    }

    #[test]
    fn admin_console_requires_admin() {
        assert!(context(UserRole::Volunteer).requires_admin().is_err());
        assert!(context(UserRole::Admin).requires_admin().is_ok());
    }
}
