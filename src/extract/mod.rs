//! Pluggable page extraction
//!
//! All site-specific markup knowledge lives behind the [`SiteExtractor`]
//! trait: one implementation per target site, so the crawl driver's state
//! machine never touches a selector. The driver hands each fetched page to
//! the extractor and gets back plain data.

mod books;

pub use books::BooksExtractor;

use crate::state::CrawlCursor;
use url::Url;

/// One product as it appears on a listing page.
///
/// The detail link is kept exactly as it appears in the markup (usually
/// relative); the driver resolves it against the page URL.
#[derive(Debug, Clone)]
pub struct PartialItem {
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub detail_href: String,
}

/// Everything extracted from one listing page.
#[derive(Debug)]
pub struct ListingPage {
    /// Items in page order
    pub items: Vec<PartialItem>,

    /// Cursor for the page after this one; `Done` when no next link exists
    pub next: CrawlCursor,
}

/// Fields that only exist on a product's detail page.
#[derive(Debug, Clone, Copy)]
pub struct DetailFields {
    /// `UNKNOWN_REVIEWS` when the figure is absent or unparseable
    pub number_of_reviews: i64,
}

/// Site-specific extraction strategy.
///
/// Implementations must be total: malformed or missing markup degrades to
/// defaults and sentinels, never to an error. The crawl driver relies on
/// that to keep one bad product from sinking a whole page.
pub trait SiteExtractor: Send + Sync {
    /// Parses a listing page into its items and the cursor for the next page.
    fn extract_listing(&self, html: &str, page_url: &Url) -> ListingPage;

    /// Parses a product detail page into its supplemental fields.
    fn extract_detail(&self, html: &str) -> DetailFields;
}
