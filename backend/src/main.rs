mod config;
mod models;
mod routes;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use log::{error, info};
use urlscan_inference::{Artifacts, CommandFeatureBuilder, UrlScanner};

use config::Config;

/// Load artifacts and wire the feature builder; nothing is served until this succeeds.
fn load_scanner(config: &Config) -> Result<UrlScanner> {
    let artifacts = Artifacts::load(&config.artifacts).context("failed to load artifacts")?;
    let builder = CommandFeatureBuilder::parse(&config.feature_builder)?
        .current_dir(&config.base_dir);
    info!(
        "feature builder: {} (in {})",
        config.feature_builder,
        config.base_dir.display()
    );
    Ok(UrlScanner::new(artifacts, Box::new(builder)))
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("starting URL classifier API");

    let config = Config::from_env()?;
    let scanner = match load_scanner(&config) {
        Ok(scanner) => scanner,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };
    let scanner = web::Data::new(Arc::new(scanner));

    let bind_address = config.bind_address();
    info!("listening on http://{}", bind_address);
    info!("workers: {}", config.workers);
    info!("endpoints:");
    info!("   GET  /ping            - health check");
    info!("   POST /debug_features  - aligned feature vector");
    info!("   POST /predict         - classify a URL");

    HttpServer::new(move || {
        // the browser extension calls from its own origin
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_header(header::CONTENT_TYPE)
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(scanner.clone())
            .configure(routes::configure)
    })
    .workers(config.workers)
    .bind(&bind_address)
    .with_context(|| format!("cannot bind {bind_address}"))?
    .run()
    .await?;

    Ok(())
}
