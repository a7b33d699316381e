#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the Solr address geocoder.
//!
//! Exposes forward geocoding at `/geocode`, reverse geocoding at
//! `/reverse` and a liveness check at `/health`. All geocoding work is
//! delegated to [`solr_geocoder::Geocoder`]; this crate only translates
//! requests and maps errors to status codes.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use solr_geocoder::Geocoder;
use solr_geocoder::config::GeocoderConfig;
use solr_geocoder_solr::SolrClient;

/// Shared application state.
pub struct AppState {
    /// Geocoding engine bound to the configured Solr core.
    pub geocoder: Geocoder,
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/geocode", web::get().to(handlers::geocode_get))
        .route("/geocode", web::post().to(handlers::geocode_post))
        .route("/reverse", web::get().to(handlers::reverse_get))
        .route("/reverse", web::post().to(handlers::reverse_post));
}

/// Starts the geocoder API server.
///
/// Loads the geocoder configuration and the Solr client settings from the
/// environment, then serves on `BIND_ADDR:PORT` (default
/// `127.0.0.1:5000`). The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, the
/// Solr client cannot be built, or the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Loading geocoder configuration...");
    let config = GeocoderConfig::from_env().map_err(|e| {
        log::error!("Invalid geocoder configuration: {e}");
        std::io::Error::other(e)
    })?;
    log::info!(
        "Loaded {} strategies over fields {:?}",
        config.strategies.len(),
        config.params
    );

    let client = SolrClient::from_env().map_err(|e| {
        log::error!("Failed to build Solr client: {e}");
        std::io::Error::other(e)
    })?;
    log::info!("Using Solr select endpoint {}", client.select_url());

    let state = web::Data::new(AppState {
        geocoder: Geocoder::new(Arc::new(config), Arc::new(client)),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
