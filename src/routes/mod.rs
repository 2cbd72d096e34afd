use actix_web::web;

pub mod admin;
pub mod opportunities;
pub mod organizations;
pub mod profile;
pub mod registrations;
pub mod stats;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // registration actions nest under /opportunities, so they go first
            .configure(registrations::configure)
            .configure(profile::configure)
            .configure(organizations::configure)
            .configure(opportunities::configure)
            .configure(stats::configure)
            .configure(admin::configure),
    );
}
