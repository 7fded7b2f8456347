use actix_web::{web, HttpResponse};

use crate::models::HealthResponse;
use crate::AppState;

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        has_api_key: state.processor.classifier_configured(),
        has_storage: state.processor.storage_configured(),
    })
}
