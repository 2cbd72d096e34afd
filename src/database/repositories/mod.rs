pub mod opportunity;
pub mod organization;
pub mod profile;
pub mod stats;

pub use opportunity::OpportunityRepository;
pub use organization::OrganizationRepository;
pub use profile::ProfileRepository;
pub use stats::StatsRepository;
