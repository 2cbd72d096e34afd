use actix_web::web;

use crate::handlers::registrations;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/opportunities/{id}/register",
        web::post().to(registrations::register),
    )
    .route(
        "/opportunities/{id}/cancel",
        web::post().to(registrations::cancel),
    )
    .service(
        web::scope("/registrations")
            .route("/my", web::get().to(registrations::my_registrations))
            .route("/{id}/confirm", web::post().to(registrations::confirm))
            .route("/{id}/check-in", web::post().to(registrations::check_in))
            .route("/{id}/check-out", web::post().to(registrations::check_out))
            .route("/{id}/complete", web::post().to(registrations::complete))
            .route("/{id}/hours", web::put().to(registrations::log_hours)),
    );
}
