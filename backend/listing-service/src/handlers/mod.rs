/// HTTP request handlers
pub mod generate;
pub mod health;
pub mod multipart;

use actix_web::web;

use crate::error::AppError;

pub use generate::{generate_csv, IMAGES_FAILED_HEADER, PRODUCTS_GENERATED_HEADER};
pub use health::health_check;
pub use multipart::collect_images;

async fn method_not_allowed() -> Result<actix_web::HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed)
}

/// Register the `/api` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/generate")
                    .route(web::post().to(generate_csv))
                    .default_service(web::to(method_not_allowed)),
            )
            .route("/health", web::get().to(health_check)),
    );
}
