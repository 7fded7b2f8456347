//! Batch orchestration: photos in, Shopify CSV out
//!
//! Images are processed in fixed-size batches. Inside a batch every image is
//! classified and uploaded concurrently; batches run one after another, which
//! bounds the number of outbound requests in flight.
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::csv_export;
use crate::error::AppError;
use crate::models::{BatchOutcome, ProcessingError, ProductRecord, UploadedImage};
use crate::providers::ProductClassifier;
use crate::storage::ImageStore;

/// Maximum images per request
pub const MAX_IMAGES: usize = 50;
/// Maximum size of a single image (10 MB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Accepted image MIME types
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&mime_type.as_str())
}

/// Request-level validation, run before any image is processed
pub fn validate_images(images: &[UploadedImage]) -> Result<(), AppError> {
    if images.is_empty() {
        return Err(AppError::Validation("No images provided".to_string()));
    }

    if images.len() > MAX_IMAGES {
        return Err(AppError::Validation(format!(
            "Too many images: {} (maximum {})",
            images.len(),
            MAX_IMAGES
        )));
    }

    for image in images {
        if image.content.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "{} exceeds the maximum size of 10 MB",
                image.filename
            )));
        }

        if !is_allowed_mime_type(&image.mime_type) {
            return Err(AppError::Validation(format!(
                "{} has unsupported type '{}'. Allowed types: {}",
                image.filename,
                image.mime_type,
                ALLOWED_MIME_TYPES.join(", ")
            )));
        }
    }

    Ok(())
}

/// A CSV built from at least one product
#[derive(Debug)]
pub struct GeneratedCsv {
    pub document: String,
    pub product_count: usize,
    /// Failures of the images that did not make it (or lost their image URL)
    pub errors: Vec<ProcessingError>,
}

/// Runs classification and upload for every image of a request
pub struct BatchProcessor {
    classifier: Arc<dyn ProductClassifier>,
    store: Arc<dyn ImageStore>,
    batch_size: usize,
}

impl BatchProcessor {
    pub fn new(
        classifier: Arc<dyn ProductClassifier>,
        store: Arc<dyn ImageStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            classifier,
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn classifier_configured(&self) -> bool {
        self.classifier.is_configured()
    }

    pub fn storage_configured(&self) -> bool {
        self.store.is_configured()
    }

    /// Process every image, collecting products and per-image errors
    ///
    /// Products keep the input order; images that fail classification are
    /// left out. An upload failure keeps the product with an empty image URL.
    pub async fn process(&self, images: &[UploadedImage]) -> BatchOutcome {
        let start = Instant::now();
        let batch_count = images.len().div_ceil(self.batch_size);
        let mut outcome = BatchOutcome::default();

        for (batch_idx, batch) in images.chunks(self.batch_size).enumerate() {
            info!(
                batch = batch_idx + 1,
                batches = batch_count,
                images = batch.len(),
                "Processing image batch"
            );

            let results = join_all(batch.iter().map(|image| self.process_image(image))).await;

            for (product, error) in results {
                outcome.products.extend(product);
                outcome.errors.extend(error);
            }
        }

        info!(
            images = images.len(),
            products = outcome.products.len(),
            errors = outcome.errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image processing complete"
        );

        outcome
    }

    async fn process_image(
        &self,
        image: &UploadedImage,
    ) -> (Option<ProductRecord>, Option<ProcessingError>) {
        let mut product = match self
            .classifier
            .classify(&image.content, &image.mime_type, &image.filename)
            .await
        {
            Ok(product) => product,
            Err(e) => {
                warn!(filename = %image.filename, index = image.index, error = %e, "Classification failed");
                return (None, Some(ProcessingError::new(&image.filename, e.to_string())));
            }
        };

        match self
            .store
            .upload(&image.content, &image.mime_type, &image.filename, image.index)
            .await
        {
            Ok(url) => {
                product.image_src = url;
                (Some(product), None)
            }
            Err(e) => {
                warn!(filename = %image.filename, index = image.index, error = %e, "Image upload failed");
                let error = ProcessingError::new(&image.filename, format!("Image upload failed: {e}"));
                (Some(product), Some(error))
            }
        }
    }

    /// Validate, process and encode a request's images
    ///
    /// Fails with `AllImagesFailed` when no product survives.
    pub async fn generate_csv(&self, images: &[UploadedImage]) -> Result<GeneratedCsv, AppError> {
        validate_images(images)?;

        let BatchOutcome { products, errors } = self.process(images).await;
        if products.is_empty() {
            return Err(AppError::AllImagesFailed(errors));
        }

        let document = csv_export::encode(&products)?;

        Ok(GeneratedCsv {
            document,
            product_count: products.len(),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::providers::MockProductClassifier;
    use crate::storage::{BlobUploader, MockImageStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn image(index: usize, filename: &str) -> UploadedImage {
        UploadedImage {
            content: vec![0xFF, 0xD8, 0xFF, index as u8],
            mime_type: "image/jpeg".to_string(),
            filename: filename.to_string(),
            index,
        }
    }

    fn product_for(filename: &str) -> ProductRecord {
        let title = format!("Product {filename}");
        ProductRecord {
            handle: crate::services::slugify(&title),
            image_alt: title.clone(),
            title,
            price: "10.00".to_string(),
            ..Default::default()
        }
    }

    fn classifier_failing_on(failing: &'static [&'static str]) -> MockProductClassifier {
        let mut classifier = MockProductClassifier::new();
        classifier.expect_classify().returning(move |_, _, filename| {
            if failing.iter().any(|f| *f == filename) {
                Err(ImageError::UpstreamStatus {
                    status: 500,
                    body: "model overloaded".to_string(),
                })
            } else {
                Ok(product_for(filename))
            }
        });
        classifier
    }

    fn store_returning_urls() -> MockImageStore {
        let mut store = MockImageStore::new();
        store
            .expect_upload()
            .returning(|_, _, filename, _| Ok(format!("https://cdn.example.com/{filename}")));
        store
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        assert!(matches!(validate_images(&[]), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_too_many_images() {
        let images: Vec<_> = (0..=MAX_IMAGES).map(|i| image(i, "a.jpg")).collect();
        assert!(matches!(validate_images(&images), Err(AppError::Validation(_))));
        assert!(validate_images(&images[..MAX_IMAGES]).is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_image() {
        let mut big = image(0, "big.jpg");
        big.content = vec![0; MAX_IMAGE_BYTES + 1];
        assert!(matches!(validate_images(&[big]), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_accepts_image_at_size_limit() {
        let mut exact = image(0, "exact.jpg");
        exact.content = vec![0; MAX_IMAGE_BYTES];
        assert!(validate_images(&[exact]).is_ok());
    }

    #[test]
    fn test_validate_mime_allow_list() {
        let mut pdf = image(0, "doc.pdf");
        pdf.mime_type = "application/pdf".to_string();
        let err = validate_images(&[image(1, "ok.jpg"), pdf]).unwrap_err();
        assert!(err.to_string().contains("doc.pdf"));

        for mime in ["image/jpg", "image/png", "image/gif", "IMAGE/WEBP"] {
            let mut img = image(0, "a");
            img.mime_type = mime.to_string();
            assert!(validate_images(&[img]).is_ok(), "{mime} should be allowed");
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let processor = BatchProcessor::new(
            Arc::new(classifier_failing_on(&["2.jpg"])),
            Arc::new(store_returning_urls()),
            4,
        );
        let images = vec![image(0, "1.jpg"), image(1, "2.jpg"), image(2, "3.jpg")];

        let outcome = processor.process(&images).await;

        let titles: Vec<_> = outcome.products.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Product 1.jpg", "Product 3.jpg"]);
        assert_eq!(outcome.products[0].image_src, "https://cdn.example.com/1.jpg");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].filename, "2.jpg");
        assert!(outcome.errors[0].message.contains("500"));

        let csv = processor.generate_csv(&images).await.unwrap();
        assert_eq!(csv.product_count, 2);
        assert_eq!(csv.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_returns_every_error() {
        let mut store = MockImageStore::new();
        store.expect_upload().never();
        let processor = BatchProcessor::new(
            Arc::new(classifier_failing_on(&["a.jpg", "b.jpg", "c.jpg"])),
            Arc::new(store),
            2,
        );
        let images = vec![image(0, "a.jpg"), image(1, "b.jpg"), image(2, "c.jpg")];

        match processor.generate_csv(&images).await {
            Err(AppError::AllImagesFailed(errors)) => {
                assert_eq!(errors.len(), 3);
                let names: Vec<_> = errors.iter().map(|e| e.filename.as_str()).collect();
                assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
            }
            other => panic!("expected all-failed error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_product_without_image() {
        let mut store = MockImageStore::new();
        store.expect_upload().returning(|_, _, filename, _| {
            if filename == "b.jpg" {
                Err(ImageError::Upstream("S3 upload failed: timeout".to_string()))
            } else {
                Ok(format!("https://cdn.example.com/{filename}"))
            }
        });
        let processor = BatchProcessor::new(
            Arc::new(classifier_failing_on(&[])),
            Arc::new(store),
            4,
        );

        let outcome = processor
            .process(&[image(0, "a.jpg"), image(1, "b.jpg")])
            .await;

        assert_eq!(outcome.products.len(), 2);
        assert_eq!(outcome.products[1].image_src, "");
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.starts_with("Image upload failed"));
    }

    #[tokio::test]
    async fn test_unconfigured_storage_is_not_an_error() {
        let processor = BatchProcessor::new(
            Arc::new(classifier_failing_on(&[])),
            Arc::new(BlobUploader::disabled()),
            4,
        );

        let outcome = processor
            .process(&[image(0, "a.jpg"), image(1, "b.jpg")])
            .await;

        assert_eq!(outcome.products.len(), 2);
        assert!(outcome.products.iter().all(|p| p.image_src.is_empty()));
        assert!(outcome.errors.is_empty());
        assert!(!processor.storage_configured());
    }

    #[tokio::test]
    async fn test_invalid_mime_rejected_before_classification() {
        let mut classifier = MockProductClassifier::new();
        classifier.expect_classify().never();
        let processor = BatchProcessor::new(
            Arc::new(classifier),
            Arc::new(BlobUploader::disabled()),
            4,
        );
        let mut svg = image(1, "logo.svg");
        svg.mime_type = "image/svg+xml".to_string();

        let result = processor.generate_csv(&[image(0, "a.jpg"), svg]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    /// Records how many classifications run at the same time
    struct SlowClassifier {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ProductClassifier for SlowClassifier {
        async fn classify(
            &self,
            _image: &[u8],
            _mime_type: &str,
            filename: &str,
        ) -> Result<ProductRecord, ImageError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(product_for(filename))
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_batch_size() {
        let classifier = Arc::new(SlowClassifier {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let processor = BatchProcessor::new(
            classifier.clone(),
            Arc::new(BlobUploader::disabled()),
            4,
        );
        let images: Vec<_> = (0..10).map(|i| image(i, &format!("{i}.jpg"))).collect();

        let outcome = processor.process(&images).await;

        assert_eq!(outcome.products.len(), 10);
        assert_eq!(classifier.peak.load(Ordering::SeqCst), 4);
        let expected: Vec<_> = (0..10).map(|i| format!("Product {i}.jpg")).collect();
        let titles: Vec<_> = outcome.products.iter().map(|p| p.title.clone()).collect();
        assert_eq!(titles, expected);
    }
}
