use actix_web::web;

use crate::handlers::admin;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/stats", web::get().to(admin::get_platform_stats))
            .route("/organizations", web::get().to(admin::list_organizations))
            .route(
                "/organizations/{id}/verify",
                web::post().to(admin::verify_organization),
            )
            .route("/users", web::get().to(admin::list_users)),
    );
}
