//! Extractor for the books.toscrape.com catalog markup
//!
//! Listing pages carry one `article.product_pod` per book and a
//! `li.next > a` pagination link; detail pages carry a product information
//! table whose "Number of reviews" row supplies the review count.

use crate::extract::{DetailFields, ListingPage, PartialItem, SiteExtractor};
use crate::record::UNKNOWN_REVIEWS;
use crate::state::CrawlCursor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extraction strategy for the books.toscrape.com markup shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooksExtractor;

impl BooksExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SiteExtractor for BooksExtractor {
    fn extract_listing(&self, html: &str, page_url: &Url) -> ListingPage {
        let document = Html::parse_document(html);

        let mut items = Vec::new();
        if let Ok(pod_selector) = Selector::parse("article.product_pod") {
            for pod in document.select(&pod_selector) {
                match extract_item(&pod) {
                    Some(item) => items.push(item),
                    None => {
                        tracing::warn!("Skipping a product without a usable link on {}", page_url);
                    }
                }
            }
        }

        ListingPage {
            items,
            next: next_cursor(&document, page_url),
        }
    }

    fn extract_detail(&self, html: &str) -> DetailFields {
        let document = Html::parse_document(html);

        DetailFields {
            number_of_reviews: extract_number_of_reviews(&document),
        }
    }
}

/// Pulls one item out of an `article.product_pod` element.
///
/// Returns `None` only when the title anchor is missing; price and rating
/// degrade to their defaults instead.
fn extract_item(pod: &ElementRef) -> Option<PartialItem> {
    let anchor_selector = Selector::parse("h3 a").ok()?;
    let anchor = pod.select(&anchor_selector).next()?;

    // The title attribute holds the full title; the anchor text is elided
    let title = match anchor.value().attr("title") {
        Some(title) => title.to_string(),
        None => anchor.text().collect::<String>().trim().to_string(),
    };
    let detail_href = anchor.value().attr("href")?.to_string();

    let price = Selector::parse("p.price_color")
        .ok()
        .and_then(|sel| pod.select(&sel).next())
        .map(|el| parse_price(&el.text().collect::<String>()))
        .unwrap_or(0.0);

    let rating = Selector::parse("p.star-rating")
        .ok()
        .and_then(|sel| pod.select(&sel).next())
        .map(|el| parse_rating(el.value().classes()))
        .unwrap_or(0);

    Some(PartialItem {
        title,
        price,
        rating,
        detail_href,
    })
}

/// Resolves the `li.next > a` pagination link against the page URL.
fn next_cursor(document: &Html, page_url: &Url) -> CrawlCursor {
    let href = Selector::parse("li.next > a")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("href").map(str::to_string));

    match href {
        Some(href) => match page_url.join(&href) {
            Ok(next_url) => CrawlCursor::Next(next_url.to_string()),
            Err(e) => {
                tracing::warn!("Unresolvable next-page link '{}' on {}: {}", href, page_url, e);
                CrawlCursor::Done
            }
        },
        None => CrawlCursor::Done,
    }
}

/// Converts a displayed price like `£51.77` (or the mojibake `Â£51.77`) to a
/// float by dropping everything but digits and the decimal point.
/// Unparseable input yields `0.0`.
fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse() {
        Ok(price) => price,
        Err(_) => {
            if !text.trim().is_empty() {
                tracing::warn!("Failed to parse price: '{}'", text);
            }
            0.0
        }
    }
}

/// Maps the textual star rating carried in element classes
/// (`star-rating Three`) to 1-5. Unrecognized labels map to 0.
fn parse_rating<'a>(classes: impl Iterator<Item = &'a str>) -> u8 {
    for class in classes {
        if let Some(rating) = rating_from_word(class.trim()) {
            return rating;
        }
    }
    0
}

fn rating_from_word(word: &str) -> Option<u8> {
    const WORDS: [&str; 5] = ["One", "Two", "Three", "Four", "Five"];

    WORDS
        .iter()
        .position(|w| w.eq_ignore_ascii_case(word))
        .map(|i| i as u8 + 1)
}

/// Finds the review count in the product information table.
///
/// Rows pair a `th` label with a `td` value; the row whose label mentions
/// reviews carries the count. Anything missing or non-numeric yields the
/// unknown sentinel.
fn extract_number_of_reviews(document: &Html) -> i64 {
    let row_selector = match Selector::parse("table.table-striped tr") {
        Ok(sel) => sel,
        Err(_) => return UNKNOWN_REVIEWS,
    };
    let th_selector = match Selector::parse("th") {
        Ok(sel) => sel,
        Err(_) => return UNKNOWN_REVIEWS,
    };
    let td_selector = match Selector::parse("td") {
        Ok(sel) => sel,
        Err(_) => return UNKNOWN_REVIEWS,
    };

    for row in document.select(&row_selector) {
        let label = match row.select(&th_selector).next() {
            Some(th) => th.text().collect::<String>(),
            None => continue,
        };
        if !label.to_lowercase().contains("review") {
            continue;
        }

        return row
            .select(&td_selector)
            .next()
            .and_then(|td| td.text().collect::<String>().trim().parse().ok())
            .unwrap_or(UNKNOWN_REVIEWS);
    }

    UNKNOWN_REVIEWS
}
