mod config;
mod inference;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::ServerConfig;
use inference::service::InferenceService;
use routes::configure_routes;
use std::env;
use storage::upload_store::UploadStore;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServerConfig::load().map_err(|e| startup_error("Configuration failed", e))?;
    log::info!(
        "Loaded configuration with {} model(s), upload dir {}, static dir {}",
        config.models.len(),
        config.upload_dir.display(),
        config.static_dir.display()
    );

    let service = InferenceService::from_config(&config)
        .map_err(|e| startup_error("Model loading failed", e))?;
    log::info!(
        "Serving {} model(s): {} with ensemble weights {:?}",
        service.model_count(),
        service.model_names().join(", "),
        service.ensemble_weights()
    );

    let store = UploadStore::new(config.upload_dir.clone());
    store
        .ensure_dir()
        .map_err(|e| startup_error("Upload directory unavailable", e))?;
    log::info!("Storing uploads in {}", store.dir().display());

    let service = web::Data::new(service);
    let store = web::Data::new(store);
    let static_dir = config.static_dir.clone();
    let bind_address = config.bind_address();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .app_data(store.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
