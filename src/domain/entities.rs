//! Domain records mirrored from persistent storage.

use serde::{Deserialize, Serialize};

/// A promotional campaign joined with its product reference.
///
/// Every field is required: a cached listing payload that drops or retypes a
/// field fails deserialization instead of producing a partial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: i64,
    pub product_id: i64,
    pub story: String,
    pub picture: String,
}

/// Base product row returned by the mobile listing query, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListingRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub story: String,
}

/// One image row keyed by its owning product.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub product_id: i64,
    pub url: String,
    pub is_main: bool,
}

/// One purchasable variant row keyed by its owning product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantRecord {
    #[serde(skip_serializing)]
    pub product_id: i64,
    pub color_code: String,
    pub size: String,
    pub stock: i64,
}

/// One variant row joined with the display name of its color.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRow {
    pub product_id: i64,
    pub color_code: String,
    pub color_name: String,
    pub size: String,
    pub stock: i64,
}

/// Color pair exposed on enriched products, unique by code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Color {
    pub code: String,
    pub name: String,
}

/// Product row after the image and variant merge steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedProduct {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub story: String,
    pub main_image: String,
    pub images: Vec<String>,
    pub variants: Vec<VariantRecord>,
    pub sizes: Vec<String>,
    pub colors: Vec<Color>,
}
