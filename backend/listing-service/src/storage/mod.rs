//! Product image storage
//!
//! Uploads photos to object storage so the CSV can reference them by public
//! URL. Storage is optional: without a bucket every upload yields an empty
//! URL and the CSV is produced without images.
use async_trait::async_trait;
use chrono::Utc;
use s3_utils::{S3Client, S3Operations};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ImageError;
use crate::services::slugify;

/// Stores an uploaded image and returns its public URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Returns an empty string when storage is not configured
    async fn upload(
        &self,
        image: &[u8],
        mime_type: &str,
        filename: &str,
        index: usize,
    ) -> Result<String, ImageError>;

    fn is_configured(&self) -> bool;
}

/// S3-backed image store
pub struct BlobUploader {
    operations: Option<S3Operations>,
    key_prefix: String,
}

impl BlobUploader {
    pub fn new(client: &S3Client, key_prefix: impl Into<String>) -> Self {
        Self {
            operations: Some(client.operations()),
            key_prefix: key_prefix.into(),
        }
    }

    /// Store that never uploads
    pub fn disabled() -> Self {
        Self {
            operations: None,
            key_prefix: String::new(),
        }
    }
}

#[async_trait]
impl ImageStore for BlobUploader {
    async fn upload(
        &self,
        image: &[u8],
        mime_type: &str,
        filename: &str,
        index: usize,
    ) -> Result<String, ImageError> {
        let Some(operations) = &self.operations else {
            debug!(filename = %filename, "Storage not configured, skipping upload");
            return Ok(String::new());
        };

        let suffix = Uuid::new_v4().simple().to_string();
        let key = build_object_key(
            &self.key_prefix,
            Utc::now().timestamp_millis(),
            index,
            &suffix[..6],
            filename,
            mime_type,
        );

        let url = operations
            .put_new_object(&key, image.to_vec(), mime_type)
            .await
            .map_err(|e| ImageError::Upstream(e.to_string()))?;

        info!(filename = %filename, key = %key, size_bytes = image.len(), "Image uploaded");
        Ok(url)
    }

    fn is_configured(&self) -> bool {
        self.operations.is_some()
    }
}

/// Unique storage key: `<prefix>/<millis>-<index>-<suffix>-<slug><ext>`
pub fn build_object_key(
    prefix: &str,
    timestamp_ms: i64,
    index: usize,
    suffix: &str,
    filename: &str,
    mime_type: &str,
) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let slug = match slugify(stem) {
        s if s.is_empty() => "image".to_string(),
        s => s,
    };
    let name = format!(
        "{timestamp_ms}-{index}-{suffix}-{slug}{}",
        extension_for(filename, mime_type)
    );

    match prefix.trim_matches('/') {
        "" => name,
        prefix => format!("{prefix}/{name}"),
    }
}

/// File extension (with dot) from the filename, falling back to the MIME type
pub fn extension_for(filename: &str, mime_type: &str) -> &'static str {
    if let Some((_, ext)) = filename.rsplit_once('.') {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" => return ".jpg",
            "jpeg" => return ".jpeg",
            "png" => return ".png",
            "gif" => return ".gif",
            "webp" => return ".webp",
            _ => {}
        }
    }

    match mime_type.to_ascii_lowercase().as_str() {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3_utils::S3Config;
    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn uploader_for(server: &MockServer) -> BlobUploader {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let config = S3Config {
            endpoint: Some(server.uri()),
            access_key_id: Some("test-access".to_string()),
            secret_access_key: Some("test-secret".to_string()),
            ..S3Config::new("catalog", "us-east-1")
        };

        BlobUploader::new(&S3Client::with_config(config).await, "products")
    }

    #[test]
    fn test_object_key_layout() {
        let key = build_object_key("products", 1_700_000_000_000, 3, "a1b2c3", "Blue Shirt.PNG", "image/png");
        assert_eq!(key, "products/1700000000000-3-a1b2c3-blue-shirt.png");
    }

    #[test]
    fn test_object_key_without_prefix_or_usable_name() {
        let key = build_object_key("", 42, 0, "ffffff", "???", "image/webp");
        assert_eq!(key, "42-0-ffffff-image.webp");
    }

    #[test]
    fn test_extension_prefers_filename() {
        assert_eq!(extension_for("photo.JPEG", "image/png"), ".jpeg");
        assert_eq!(extension_for("photo.gif", "image/jpeg"), ".gif");
    }

    #[test]
    fn test_extension_falls_back_to_mime() {
        assert_eq!(extension_for("photo", "image/png"), ".png");
        assert_eq!(extension_for("photo.heic", "image/webp"), ".webp");
        assert_eq!(extension_for("photo.heic", "image/jpg"), ".jpg");
        assert_eq!(extension_for("photo", "application/octet-stream"), ".jpg");
    }

    #[tokio::test]
    async fn test_disabled_store_returns_empty_url() {
        let store = BlobUploader::disabled();

        assert!(!store.is_configured());
        let url = store.upload(b"img", "image/png", "a.png", 0).await.unwrap();
        assert_eq!(url, "");
    }

    #[tokio::test]
    async fn test_configured_store_uploads_without_overwrite() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/catalog/products/\d+-2-[0-9a-f]{6}-blue-shirt\.png$"))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let store = uploader_for(&server).await;

        assert!(store.is_configured());
        let url = store
            .upload(b"png-bytes", "image/png", "Blue Shirt.png", 2)
            .await
            .unwrap();

        assert!(url.starts_with(&format!("{}/catalog/products/", server.uri())));
        assert!(url.ends_with("-blue-shirt.png"));
    }

    #[tokio::test]
    async fn test_existing_object_is_an_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(412).set_body_raw(
                "<Error><Code>PreconditionFailed</Code><Message>At least one of the pre-conditions you specified did not hold</Message></Error>",
                "application/xml",
            ))
            .mount(&server)
            .await;
        let store = uploader_for(&server).await;

        match store.upload(b"img", "image/jpeg", "mug.jpg", 0).await {
            Err(ImageError::Upstream(message)) => assert!(message.contains("already exists")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
