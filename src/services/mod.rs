pub mod auth;
pub mod capacity;
pub mod registration;
pub mod user_context;
pub mod waitlist;

pub use registration::{OpportunityChange, RegistrationOutcome, RegistrationService};
pub use user_context::{Operation, UserContext};
