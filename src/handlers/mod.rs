pub mod admin;
pub mod opportunities;
pub mod organizations;
pub mod profile;
pub mod registrations;
pub mod shared;
pub mod stats;
