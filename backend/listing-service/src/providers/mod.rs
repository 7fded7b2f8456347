//! Product classification providers

pub mod vision;

use async_trait::async_trait;

use crate::error::ImageError;
use crate::models::ProductRecord;

pub use vision::{VisionClient, VisionClientConfig};

/// Turns a product photo into a product record
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductClassifier: Send + Sync {
    async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<ProductRecord, ImageError>;

    /// Whether credentials are present for outbound calls
    fn is_configured(&self) -> bool;
}
