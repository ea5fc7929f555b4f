// web-server/src/main.rs
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config, SystemClock};
use std::io;
use std::sync::Arc;
use web_server::middleware::{RateLimiter, SessionGate};
use web_server::{api, session_manager};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load configuration
    let config = Config::from_env();

    setup_tracing(&config.log_level)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    // A weak signing key stops the server before it binds
    let manager = session_manager(&config, Arc::new(SystemClock)).map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    // Save address before moving config into web::Data
    let server_addr = config.web_server_addr.clone();

    tracing::info!("Starting Web Server on {}", server_addr);

    let config_data = web::Data::new(config.clone());
    let manager_data = web::Data::new(manager.clone());
    let rate_limiter = RateLimiter::new(&config.rate_limit);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(manager_data.clone())
            .wrap(SessionGate::new(
                manager.clone(),
                config.session.clone(),
                config.routes.clone(),
            ))
            .wrap(rate_limiter.clone())
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
