//! Vision language model client for product cataloguing
//!
//! Sends one photo per request to an OpenAI-compatible chat-completion
//! endpoint and turns the JSON reply into a `ProductRecord`.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, error, info};

use super::ProductClassifier;
use crate::error::ImageError;
use crate::models::ProductRecord;
use crate::services::slugify;

const DEFAULT_TITLE: &str = "Untitled Product";
const DEFAULT_PRICE: &str = "0.00";
/// Characters of the raw reply kept in parse errors
const SNIPPET_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are an e-commerce cataloguing assistant. \
Look at the product photo and write a listing for a Shopify store. \
Reply with a single JSON object and nothing else, using exactly these keys: \
\"title\" (concise product name, max 70 characters), \
\"body_html\" (2-3 sentence description as simple HTML paragraphs), \
\"vendor\" (brand if visible, otherwise an empty string), \
\"type\" (product category, e.g. \"T-Shirt\" or \"Mug\"), \
\"tags\" (comma-separated keywords), \
\"price\" (estimated retail price in USD as a number without currency symbol).";

static PRICE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// Settings for `VisionClient`
#[derive(Debug, Clone)]
pub struct VisionClientConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Sent as `HTTP-Referer`
    pub referer: Option<String>,
    /// Sent as `X-Title`
    pub title: String,
}

/// Chat-completion vision client
pub struct VisionClient {
    client: Client,
    config: VisionClientConfig,
}

// ============================================
// Response types
// ============================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl VisionClient {
    pub fn new(config: VisionClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn build_request_body(&self, data_url: &str, filename: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": format!(
                                "Create the Shopify listing JSON for this product photo (file name: {filename})."
                            )
                        },
                        { "type": "image_url", "image_url": { "url": data_url } }
                    ]
                }
            ],
            "temperature": 0.4,
            "max_tokens": 1000
        })
    }
}

#[async_trait]
impl ProductClassifier for VisionClient {
    async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<ProductRecord, ImageError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ImageError::Configuration("VISION_API_KEY is not set".to_string()))?;

        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        let body = self.build_request_body(&data_url, filename);

        debug!(
            filename = %filename,
            image_bytes = image.len(),
            model = %self.config.model,
            "Calling vision API"
        );

        let start = Instant::now();
        let mut request = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header("X-Title", &self.config.title)
            .json(&body);
        if let Some(referer) = &self.config.referer {
            request = request.header("HTTP-Referer", referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ImageError::Upstream(format!("Failed to call vision API: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ImageError::Upstream(format!("Failed to read vision API response: {e}")))?;

        if !status.is_success() {
            error!(
                status = %status,
                filename = %filename,
                body_len = text.len(),
                "Vision API request failed"
            );
            return Err(ImageError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let content = extract_message_content(&text)?;
        let product = parse_product_reply(&content, filename)?;

        info!(
            filename = %filename,
            handle = %product.handle,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Product classified"
        );

        Ok(product)
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

/// Pull the assistant text out of a chat-completion envelope
fn extract_message_content(raw: &str) -> Result<String, ImageError> {
    let envelope: ChatCompletionResponse =
        serde_json::from_str(raw).map_err(|e| parse_error(e.to_string(), raw))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| parse_error("Model response has no message content".to_string(), raw))
}

/// Parse the model's JSON reply into a product record
///
/// The reply may be wrapped in a markdown code fence. Missing fields fall
/// back to defaults; the handle falls back to the filename when the title
/// has no usable characters.
pub fn parse_product_reply(reply: &str, filename: &str) -> Result<ProductRecord, ImageError> {
    let json_text = strip_code_fence(reply);
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| parse_error(e.to_string(), reply))?;
    let fields = value
        .as_object()
        .ok_or_else(|| parse_error("Expected a JSON object".to_string(), reply))?;

    let title = text_field(fields.get("title")).unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let handle = match slugify(&title) {
        slug if !slug.is_empty() => slug,
        _ => fallback_handle(filename),
    };

    Ok(ProductRecord {
        handle,
        body_html: text_field(fields.get("body_html")).unwrap_or_default(),
        vendor: text_field(fields.get("vendor")).unwrap_or_default(),
        product_type: text_field(fields.get("type")).unwrap_or_default(),
        tags: text_field(fields.get("tags")).unwrap_or_default(),
        price: price_field(fields.get("price")),
        sku: String::new(),
        barcode: String::new(),
        image_src: String::new(),
        image_alt: title.clone(),
        title,
    })
}

/// JSON body of the reply, taken from the first fenced block when the model
/// wrapped it in markdown, possibly after some prose
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    // Drop the info string (```json) along with the opening fence
    let rest = &trimmed[start + 3..];
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches("json"),
    };
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(|v| text_field(Some(v))).collect();
            Some(parts.join(", ")).filter(|s| !s.is_empty())
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn price_field(value: Option<&Value>) -> String {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            // "1,299.00" uses commas for thousands, "12,50" for decimals
            let normalized = if s.contains('.') {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            };
            PRICE_NUMBER
                .find(&normalized)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        }
        _ => None,
    };

    amount
        .filter(|a| a.is_finite() && *a >= 0.0)
        .map(|a| format!("{a:.2}"))
        .unwrap_or_else(|| DEFAULT_PRICE.to_string())
}

fn fallback_handle(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);

    match slugify(stem) {
        slug if !slug.is_empty() => format!("product-{slug}"),
        _ => "product-image".to_string(),
    }
}

fn parse_error(message: String, raw: &str) -> ImageError {
    ImageError::Parse {
        message,
        snippet: raw.chars().take(SNIPPET_CHARS).collect(),
    }
}
