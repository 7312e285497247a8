//! The output data model: one row per extracted product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review count recorded when the detail page could not be fetched or its
/// review figure could not be parsed. Distinct from a legitimate `0`.
pub const UNKNOWN_REVIEWS: i64 = -1;

/// Column the final deduplication pass keys on.
///
/// Titles are what the source site displays and are not guaranteed globally
/// unique; first occurrence wins.
pub const DEDUP_FIELD: &str = "title";

/// One extracted product, in output-schema order.
///
/// Serialized to CSV with the columns of [`ItemRecord::FIELDS`]; `scraped_at`
/// is written as an RFC 3339 UTC timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub number_of_reviews: i64,
    pub product_page_url: String,
    pub scraped_at: DateTime<Utc>,
}

impl ItemRecord {
    /// CSV header, in the order fields serialize.
    pub const FIELDS: [&'static str; 6] = [
        "title",
        "price",
        "rating",
        "number_of_reviews",
        "product_page_url",
        "scraped_at",
    ];
}
