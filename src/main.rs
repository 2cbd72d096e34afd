use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use safha::database::{
    init_database,
    repositories::{
        OpportunityRepository, OrganizationRepository, ProfileRepository, StatsRepository,
    },
    store::PgRegistrationStore,
};
use safha::middleware::RequestIdMiddleware;
use safha::{Config, RegistrationService, routes};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Safha API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    env_logger::init();

    log::info!(
        "Starting Safha API server (environment: {})",
        config.environment
    );
    if config.is_production() && config.jwt_secret.starts_with("your-super-secret") {
        log::warn!("JWT_SECRET is still the development default");
    }

    let pool = init_database(&config.database_url, config.database_max_connections).await?;
    log::info!("Database initialized");

    let store = PgRegistrationStore::new(pool.clone()).with_lock_timeout(config.lock_timeout_ms);
    let registration_service = web::Data::new(RegistrationService::new(Arc::new(store)));
    let profile_repo_data = web::Data::new(ProfileRepository::new(pool.clone()));
    let organization_repo_data = web::Data::new(OrganizationRepository::new(pool.clone()));
    let opportunity_repo_data = web::Data::new(OpportunityRepository::new(pool.clone()));
    let stats_repo_data = web::Data::new(StatsRepository::new(pool.clone()));
    let config_data = web::Data::new(config.clone());

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(registration_service.clone())
            .app_data(profile_repo_data.clone())
            .app_data(organization_repo_data.clone())
            .app_data(opportunity_repo_data.clone())
            .app_data(stats_repo_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&config_data.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
