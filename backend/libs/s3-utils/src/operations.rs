/// S3 operations for media upload
use crate::config::S3Config;
use crate::S3Error;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct S3Operations {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Operations {
    pub fn new(client: Arc<Client>, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Upload a new object, refusing to replace an existing one
    ///
    /// Sends `If-None-Match: *` so S3 answers 412 when the key is taken.
    /// Returns the public URL of the stored object.
    pub async fn put_new_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, S3Error> {
        let size = body.len();

        let result = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(key = %key, size_bytes = size, "S3 object stored");
                Ok(self.object_url(key))
            }
            Err(err) => {
                let status = err.raw_response().map(|r| r.status().as_u16());
                // 409 is returned when a concurrent conditional write wins the race
                if matches!(status, Some(412) | Some(409)) {
                    Err(S3Error::AlreadyExists(key.to_string()))
                } else {
                    Err(S3Error::Upload(DisplayErrorContext(&err).to_string()))
                }
            }
        }
    }

    /// Public URL of an object in the configured bucket
    pub fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}
