//! Listing Service - Main entry point
//!
//! Serves the CSV generator API:
//! - POST /api/generate: product photos in, Shopify CSV out
//! - GET /api/health: liveness and configuration status

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Result;
use s3_utils::S3Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_service::handlers::{self, IMAGES_FAILED_HEADER, PRODUCTS_GENERATED_HEADER};
use listing_service::{
    AppState, BatchProcessor, BlobUploader, Config, ImageStore, ProductClassifier, VisionClient,
    VisionClientConfig,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Initialize tracing
    let json_logs = config.json_logs();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listing_service=debug".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
        }))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting listing-service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize vision client
    let vision_api_key = config.vision_api_key();
    if vision_api_key.is_none() {
        warn!("VISION_API_KEY not set, every image will fail classification");
    }
    let classifier: Arc<dyn ProductClassifier> = Arc::new(
        VisionClient::new(VisionClientConfig {
            api_key: vision_api_key,
            api_url: config.vision_api_url.clone(),
            model: config.vision_model.clone(),
            referer: config.app_referer_url.clone(),
            title: config.app_title.clone(),
        })
        .map_err(|e| {
            error!("Failed to build vision HTTP client: {}", e);
            anyhow::anyhow!("Vision client error: {}", e)
        })?,
    );
    info!(model = %config.vision_model, "Vision client initialized");

    // Initialize object storage (optional)
    let store: Arc<dyn ImageStore> = match config.storage() {
        Some(storage_config) => {
            info!(bucket = %storage_config.bucket, region = %storage_config.region, "Object storage enabled");
            let client = S3Client::with_config(storage_config).await;
            Arc::new(BlobUploader::new(&client, config.storage_key_prefix.clone()))
        }
        None => {
            warn!("STORAGE_BUCKET not set, CSV rows will have no image URLs");
            Arc::new(BlobUploader::disabled())
        }
    };

    let state = web::Data::new(AppState::new(BatchProcessor::new(
        classifier,
        store,
        config.batch_size(),
    )));

    let bind_addr = config.bind_address();
    let cors_origins = config.cors_allowed_origins.clone();
    info!("Listening on http://{}", bind_addr);

    HttpServer::new(move || {
        // Build CORS configuration from allowed origins
        let mut cors = Cors::default();
        for origin in cors_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .expose_headers([
                header::CONTENT_DISPOSITION.as_str(),
                PRODUCTS_GENERATED_HEADER,
                IMAGES_FAILED_HEADER,
            ])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("listing-service stopped");
    Ok(())
}
