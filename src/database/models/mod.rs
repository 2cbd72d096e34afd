pub mod macros;
pub mod opportunity;
pub mod organization;
pub mod profile;
pub mod registration;
pub mod stats;

// Re-export all models for easy importing
pub use opportunity::*;
pub use organization::*;
pub use profile::*;
pub use registration::*;
pub use stats::*;
