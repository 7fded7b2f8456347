/// Data models for the listing pipeline
use serde::Serialize;

/// One photo received in a generate request
///
/// Lives only for the duration of the request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub content: Vec<u8>,
    /// MIME essence as sent by the client, e.g. `image/png`
    pub mime_type: String,
    pub filename: String,
    /// Position of the image in the request, starting at 0
    pub index: usize,
}

/// A product row destined for the Shopify CSV
///
/// Built by the vision client; `image_src` is set once after a successful
/// upload. `handle` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductRecord {
    pub handle: String,
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub price: String,
    pub sku: String,
    pub barcode: String,
    pub image_src: String,
    pub image_alt: String,
}

/// A per-image failure collected while processing a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingError {
    pub filename: String,
    pub message: String,
}

impl ProcessingError {
    pub fn new(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            message: message.into(),
        }
    }
}

/// Result of processing every image of a request
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful products, in input order
    pub products: Vec<ProductRecord>,
    pub errors: Vec<ProcessingError>,
}

/// Response body of `GET /api/health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub has_api_key: bool,
    pub has_storage: bool,
}
