/// CSV generation handler
///
/// POST /api/generate: multipart `images` in, Shopify CSV attachment out.
use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use tracing::info;

use super::multipart::collect_images;
use crate::error::Result;
use crate::AppState;

/// Number of products in the returned CSV
pub const PRODUCTS_GENERATED_HEADER: &str = "X-Products-Generated";
/// Number of per-image failures, including lost image uploads
pub const IMAGES_FAILED_HEADER: &str = "X-Images-Failed";

pub async fn generate_csv(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let images = collect_images(payload).await?;
    info!(images = images.len(), "Generate request received");

    let generated = state.processor.generate_csv(&images).await?;

    let filename = format!("shopify-products-{}.csv", Utc::now().timestamp_millis());
    info!(
        products = generated.product_count,
        failed = generated.errors.len(),
        filename = %filename,
        "CSV generated"
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .insert_header((PRODUCTS_GENERATED_HEADER, generated.product_count.to_string()))
        .insert_header((IMAGES_FAILED_HEADER, generated.errors.len().to_string()))
        .body(generated.document))
}
