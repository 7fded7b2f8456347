//! Listing Service - turns product photos into a Shopify import CSV
//!
//! This service provides:
//! - Multipart intake of up to 50 product photos per request
//! - Product classification through an OpenAI-compatible vision model
//! - Optional upload of the photos to S3-compatible object storage
//! - Shopify product CSV encoding (UTF-8 BOM, CRLF)

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, ImageError};
pub use models::{BatchOutcome, HealthResponse, ProcessingError, ProductRecord, UploadedImage};
pub use providers::{ProductClassifier, VisionClient, VisionClientConfig};
pub use services::{BatchProcessor, GeneratedCsv};
pub use storage::{BlobUploader, ImageStore};

/// Shared state for HTTP handlers
pub struct AppState {
    pub processor: BatchProcessor,
}

impl AppState {
    pub fn new(processor: BatchProcessor) -> Self {
        Self { processor }
    }
}
