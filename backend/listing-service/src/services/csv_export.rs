//! Shopify product CSV encoding
//!
//! Output starts with a UTF-8 byte-order mark and uses CRLF line endings so
//! that Excel and the Shopify importer read it without re-encoding. Fields are
//! quoted only when they contain a comma, quote or line break.
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::models::ProductRecord;

const UTF8_BOM: &str = "\u{FEFF}";

/// Shopify product import columns, in order
pub const SHOPIFY_HEADERS: [&str; 26] = [
    "Handle",
    "Title",
    "Body (HTML)",
    "Vendor",
    "Type",
    "Tags",
    "Published",
    "Option1 Name",
    "Option1 Value",
    "Variant SKU",
    "Variant Grams",
    "Variant Inventory Tracker",
    "Variant Inventory Qty",
    "Variant Inventory Policy",
    "Variant Fulfillment Service",
    "Variant Price",
    "Variant Compare At Price",
    "Variant Requires Shipping",
    "Variant Taxable",
    "Variant Barcode",
    "Image Src",
    "Image Position",
    "Image Alt Text",
    "Gift Card",
    "SEO Title",
    "SEO Description",
];

fn product_row(product: &ProductRecord) -> [&str; 26] {
    let image_position = if product.image_src.is_empty() { "" } else { "1" };

    [
        &product.handle,
        &product.title,
        &product.body_html,
        &product.vendor,
        &product.product_type,
        &product.tags,
        "true",
        "Title",
        "Default Title",
        &product.sku,
        "0",
        "",
        "",
        "deny",
        "manual",
        &product.price,
        "",
        "true",
        "true",
        &product.barcode,
        &product.image_src,
        image_position,
        &product.image_alt,
        "false",
        &product.title,
        "",
    ]
}

/// Encode products into a Shopify import document
///
/// The header row is always present, followed by one record per product.
/// Records are CRLF-joined without a trailing line break.
pub fn encode(products: &[ProductRecord]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(UTF8_BOM.as_bytes().to_vec());

    writer.write_record(SHOPIFY_HEADERS)?;
    for product in products {
        writer.write_record(product_row(product))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    // Every field is a &str, so the buffer is valid UTF-8
    let mut document = String::from_utf8_lossy(&bytes).into_owned();

    if document.ends_with("\r\n") {
        document.truncate(document.len() - 2);
    }

    Ok(document)
}
