//! Configuration for listing service
use s3_utils::S3Config;
use serde::Deserialize;

/// Main configuration struct, loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the vision API. Absent or empty disables classification.
    #[serde(default)]
    pub vision_api_key: Option<String>,

    /// Chat-completion endpoint of the vision model
    #[serde(default = "default_vision_api_url")]
    pub vision_api_url: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Sent as `HTTP-Referer` on outbound vision calls
    #[serde(default)]
    pub app_referer_url: Option<String>,

    /// Sent as `X-Title` on outbound vision calls
    #[serde(default = "default_app_title")]
    pub app_title: String,

    // ============================================
    // Object storage
    // ============================================
    /// Bucket for product images; storage is disabled without it
    #[serde(default)]
    pub storage_bucket: Option<String>,

    #[serde(default = "default_storage_region")]
    pub storage_region: String,

    /// S3-compatible endpoint override
    #[serde(default)]
    pub storage_endpoint: Option<String>,

    /// Public/CDN base URL for uploaded objects
    #[serde(default)]
    pub storage_public_base_url: Option<String>,

    #[serde(default)]
    pub storage_path_style: bool,

    #[serde(default)]
    pub storage_access_key_id: Option<String>,

    #[serde(default)]
    pub storage_secret_access_key: Option<String>,

    #[serde(default = "default_storage_key_prefix")]
    pub storage_key_prefix: String,

    // ============================================
    // Processing
    // ============================================
    /// Images classified and uploaded concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Comma-separated list of allowed CORS origins, `*` for any
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// `json` for JSON log lines, anything else for plain text
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_vision_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_vision_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_app_title() -> String {
    "Shopify CSV Generator".to_string()
}

fn default_storage_region() -> String {
    "us-east-1".to_string()
}

fn default_storage_key_prefix() -> String {
    "products".to_string()
}

fn default_batch_size() -> usize {
    4
}

fn default_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Vision API key, ignoring blank values
    pub fn vision_api_key(&self) -> Option<String> {
        non_blank(&self.vision_api_key)
    }

    /// Storage settings, or `None` when no bucket is configured
    pub fn storage(&self) -> Option<S3Config> {
        let bucket = non_blank(&self.storage_bucket)?;

        Some(S3Config {
            bucket,
            region: self.storage_region.clone(),
            endpoint: non_blank(&self.storage_endpoint),
            public_base_url: non_blank(&self.storage_public_base_url),
            path_style: self.storage_path_style,
            access_key_id: non_blank(&self.storage_access_key_id),
            secret_access_key: non_blank(&self.storage_secret_access_key),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.vision_model, "openai/gpt-4o-mini");
        assert_eq!(config.batch_size(), 4);
        assert!(config.vision_api_key().is_none());
        assert!(config.storage().is_none());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = config_from(&[("VISION_API_KEY", "   ")]);
        assert!(config.vision_api_key().is_none());

        let config = config_from(&[("VISION_API_KEY", "sk-test")]);
        assert_eq!(config.vision_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_storage_settings() {
        let config = config_from(&[
            ("STORAGE_BUCKET", "catalog-images"),
            ("STORAGE_REGION", "eu-central-1"),
            ("STORAGE_ENDPOINT", "http://localhost:9000"),
            ("STORAGE_PATH_STYLE", "true"),
        ]);

        let storage = config.storage().unwrap();
        assert_eq!(storage.bucket, "catalog-images");
        assert_eq!(storage.region, "eu-central-1");
        assert_eq!(storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(storage.path_style);
        assert!(storage.public_base_url.is_none());
    }

    #[test]
    fn test_batch_size_never_zero() {
        let config = config_from(&[("BATCH_SIZE", "0"), ("PORT", "8090")]);
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.port, 8090);
    }
}
