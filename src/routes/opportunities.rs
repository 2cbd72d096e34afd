use actix_web::web;

use crate::handlers::opportunities;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/opportunities")
            .route("", web::get().to(opportunities::list_opportunities))
            .route("", web::post().to(opportunities::create_opportunity))
            .route("/{id}", web::get().to(opportunities::get_opportunity))
            .route("/{id}", web::put().to(opportunities::update_opportunity))
            .route("/{id}/status", web::post().to(opportunities::update_status))
            .route(
                "/{id}/registrations",
                web::get().to(opportunities::get_roster),
            ),
    );
}
