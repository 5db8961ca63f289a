// src/main.rs

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use devtrack::app_state::AppState;
use devtrack::config::{Config, StorageBackend};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    if config.storage == StorageBackend::Memory {
        info!("Using in-memory storage; data is lost on shutdown");
    }
    if config.token_ttl_hours.is_none() {
        info!("Token expiry is disabled");
    }

    let bind = (config.bind_address.clone(), config.port);
    let frontend_origin = config.frontend_origin.clone();
    let state = AppState::init(config).await.map_err(|e| {
        error!("MongoDB connection error: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    info!("Server running on {}:{}", bind.0, bind.1);
    match &frontend_origin {
        Some(origin) => info!("Allowed CORS Origin: {}", origin),
        None => info!("Allowed CORS Origin: any"),
    }

    HttpServer::new(move || {
        let cors = match &frontend_origin {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::AUTHORIZATION,
        ])
        .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(devtrack::configure)
    })
    .bind(bind)?
    .run()
    .await
}
