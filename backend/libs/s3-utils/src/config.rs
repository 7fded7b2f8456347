/// S3 configuration shared across services
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom endpoint for S3-compatible storage (MinIO, R2, ...)
    pub endpoint: Option<String>,
    /// Base URL for public access (CDN domain)
    pub public_base_url: Option<String>,
    /// Whether to use path-style URLs (false = virtual-hosted-style)
    pub path_style: bool,
    /// Explicit credentials; the default AWS credential chain is used when unset
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Minimal configuration for a bucket in a region
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            public_base_url: None,
            path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    /// Public URL of an object key
    ///
    /// Prefers the configured public base URL, then the custom endpoint
    /// (always path-style), then the AWS virtual-hosted or path-style URL.
    pub fn object_url(&self, key: &str) -> String {
        if let Some(base) = non_empty(&self.public_base_url) {
            return format!("{}/{}", base.trim_end_matches('/'), key);
        }

        if let Some(endpoint) = non_empty(&self.endpoint) {
            return format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key);
        }

        if self.path_style {
            format!("https://s3.{}.amazonaws.com/{}/{}", self.region, self.bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
