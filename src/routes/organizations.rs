use actix_web::web;

use crate::handlers::{opportunities, organizations};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/organizations")
            .route("", web::post().to(organizations::create_organization))
            .route("/mine", web::get().to(organizations::get_my_organization))
            .route(
                "/mine/opportunities",
                web::get().to(opportunities::list_my_opportunities),
            )
            .route("/{id}/members", web::get().to(organizations::get_members)),
    );
}
