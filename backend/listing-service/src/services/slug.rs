//! URL-safe handles for Shopify products and storage keys
use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Normalize text into a lowercase, hyphen-separated handle
///
/// Characters outside `[a-z0-9_]`, whitespace and hyphens are dropped, runs of
/// separators collapse into one hyphen, and leading/trailing hyphens are
/// trimmed. The result may be empty.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}
