use actix_web::web;

use crate::handlers::profile;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile")
            .route(web::get().to(profile::get_profile))
            .route(web::put().to(profile::update_profile)),
    );
}
