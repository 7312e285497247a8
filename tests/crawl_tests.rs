//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for a catalog site and run the full
//! crawl cycle end-to-end: pagination, detail-page enrichment, retries,
//! checkpointing, and the final dedup pass.

use catwalk::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use catwalk::crawler::{Coordinator, CrawlOutcome};
use catwalk::extract::BooksExtractor;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing output into `dir`
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
            max_attempts: 3,
            polite_delay_ms: 10, // Very short for testing
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            csv_path: dir.path().join("products.csv").display().to_string(),
            checkpoint_path: dir.path().join("checkpoint.json").display().to_string(),
        },
    }
}

/// Builds a listing page; products are (title, price, rating word, detail href)
fn listing_page(products: &[(&str, &str, &str, &str)], next_href: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (title, price, rating, href) in products {
        html.push_str(&format!(
            r#"<article class="product_pod">
                <p class="star-rating {rating}"></p>
                <h3><a href="{href}" title="{title}">{title}</a></h3>
                <p class="price_color">{price}</p>
            </article>"#
        ));
    }
    if let Some(next) = next_href {
        html.push_str(&format!(
            r#"<ul class="pager"><li class="next"><a href="{next}">next</a></li></ul>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

fn detail_page(reviews: &str) -> String {
    format!(
        r#"<html><body><table class="table table-striped">
            <tr><th>UPC</th><td>a897fe39b1053632</td></tr>
            <tr><th>Number of reviews</th><td>{reviews}</td></tr>
        </table></body></html>"#
    )
}

async fn mount_html(server: &MockServer, at: &str, html: String, expected_hits: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        );
    match expected_hits {
        Some(hits) => mock.expect(hits).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Reads the output store back as (header, rows)
fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn read_checkpoint(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

async fn run_crawler(config: Config, fresh: bool) -> CrawlOutcome {
    let mut coordinator = Coordinator::new(config, BooksExtractor::new(), fresh)
        .expect("Failed to create coordinator");
    coordinator.run().await
}

#[tokio::test]
async fn test_full_crawl_two_pages() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    mount_html(
        &mock_server,
        "/",
        listing_page(
            &[
                ("Book A", "£51.77", "Three", "catalogue/a_1/index.html"),
                ("Book B", "£10.00", "One", "catalogue/b_2/index.html"),
            ],
            Some("catalogue/page-2.html"),
        ),
        None,
    )
    .await;
    mount_html(
        &mock_server,
        "/catalogue/page-2.html",
        listing_page(&[("Book C", "Â£23.88", "Five", "c_3/index.html")], None),
        None,
    )
    .await;
    mount_html(&mock_server, "/catalogue/a_1/index.html", detail_page("12"), None).await;
    mount_html(&mock_server, "/catalogue/b_2/index.html", detail_page("0"), None).await;
    mount_html(&mock_server, "/catalogue/c_3/index.html", detail_page("7"), None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let outcome = run_crawler(config, false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    let (headers, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(
        headers,
        vec!["title", "price", "rating", "number_of_reviews", "product_page_url", "scraped_at"]
    );
    assert_eq!(rows.len(), 3);

    // Listing fields, detail fields, and the absolute product URL all land
    assert_eq!(rows[0][0], "Book A");
    assert_eq!(rows[0][1], "51.77");
    assert_eq!(rows[0][2], "3");
    assert_eq!(rows[0][3], "12");
    assert_eq!(
        rows[0][4],
        format!("{}/catalogue/a_1/index.html", mock_server.uri())
    );

    // A genuine zero review count survives as 0, not the sentinel
    assert_eq!(rows[1][0], "Book B");
    assert_eq!(rows[1][3], "0");

    // Mojibake price and a detail link relative to page 2 both resolve
    assert_eq!(rows[2][0], "Book C");
    assert_eq!(rows[2][1], "23.88");
    assert_eq!(rows[2][2], "5");
    assert_eq!(
        rows[2][4],
        format!("{}/catalogue/c_3/index.html", mock_server.uri())
    );

    // Terminal checkpoint
    let checkpoint = read_checkpoint(&dir.path().join("checkpoint.json"));
    assert_eq!(checkpoint["next_url"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_resume_after_completion_fetches_nothing() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    // Every page may be fetched exactly once across BOTH runs
    mount_html(
        &mock_server,
        "/",
        listing_page(&[("Book A", "£51.77", "Three", "catalogue/a_1/index.html")], None),
        Some(1),
    )
    .await;
    mount_html(
        &mock_server,
        "/catalogue/a_1/index.html",
        detail_page("12"),
        Some(1),
    )
    .await;

    let dir = TempDir::new().unwrap();

    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);
    let after_first = std::fs::read_to_string(dir.path().join("products.csv")).unwrap();

    // Second run resumes from the terminal checkpoint: no fetches, no new rows
    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);
    let after_second = std::fs::read_to_string(dir.path().join("products.csv")).unwrap();

    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_retry_exhaustion_ends_crawl_cleanly() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    mount_html(
        &mock_server,
        "/",
        listing_page(
            &[("Book A", "£51.77", "Three", "catalogue/a_1/index.html")],
            Some("catalogue/page-2.html"),
        ),
        None,
    )
    .await;
    mount_html(&mock_server, "/catalogue/a_1/index.html", detail_page("12"), None).await;

    // Page 2 always fails; it must be attempted exactly max_attempts times
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::ListingFetchFailed);

    // Page 1 results were persisted before the failure
    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "Book A");

    // The checkpoint still names the failed page, so a rerun retries it
    let checkpoint = read_checkpoint(&dir.path().join("checkpoint.json"));
    assert_eq!(
        checkpoint["next_url"],
        format!("{}/catalogue/page-2.html", mock_server.uri())
    );
}

#[tokio::test]
async fn test_failed_enrichment_degrades_to_sentinel() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    mount_html(
        &mock_server,
        "/",
        listing_page(
            &[
                ("Book A", "£51.77", "Three", "catalogue/a_1/index.html"),
                ("Book B", "£10.00", "One", "catalogue/b_2/index.html"),
            ],
            None,
        ),
        None,
    )
    .await;

    // Book A's detail page is gone; each attempt gets a 404
    Mock::given(method("GET"))
        .and(path("/catalogue/a_1/index.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/catalogue/b_2/index.html", detail_page("5"), None).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    // Book A still appears, listing fields intact, reviews unknown
    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "Book A");
    assert_eq!(rows[0][1], "51.77");
    assert_eq!(rows[0][3], "-1");
    assert_eq!(rows[1][0], "Book B");
    assert_eq!(rows[1][3], "5");
}

#[tokio::test]
async fn test_resume_from_mid_crawl_checkpoint() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    // Page 1 was already crawled in a previous run; it must not be re-fetched
    mount_html(&mock_server, "/", listing_page(&[], None), Some(0)).await;
    mount_html(
        &mock_server,
        "/catalogue/page-2.html",
        listing_page(&[("Book C", "£23.88", "Five", "c_3/index.html")], None),
        None,
    )
    .await;
    mount_html(&mock_server, "/catalogue/c_3/index.html", detail_page("7"), None).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("checkpoint.json"),
        format!(
            r#"{{"next_url": "{}/catalogue/page-2.html"}}"#,
            mock_server.uri()
        ),
    )
    .unwrap();

    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "Book C");
}

#[tokio::test]
async fn test_preset_stop_flag_interrupts_before_fetching() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    mount_html(&mock_server, "/", listing_page(&[], None), Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let mut coordinator = Coordinator::new(config, BooksExtractor::new(), false)
        .expect("Failed to create coordinator");
    coordinator.shutdown_flag().store(true, Ordering::Relaxed);

    let outcome = coordinator.run().await;
    assert_eq!(outcome, CrawlOutcome::Interrupted);

    // Nothing was crawled: header-only store, no checkpoint written
    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert!(rows.is_empty());
    assert!(!dir.path().join("checkpoint.json").exists());
}

#[tokio::test]
async fn test_fresh_recrawl_dedups_repeated_rows() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    mount_html(
        &mock_server,
        "/",
        listing_page(
            &[
                ("Book A", "£51.77", "Three", "catalogue/a_1/index.html"),
                ("Book B", "£10.00", "One", "catalogue/b_2/index.html"),
            ],
            None,
        ),
        Some(2),
    )
    .await;
    mount_html(&mock_server, "/catalogue/a_1/index.html", detail_page("12"), Some(2)).await;
    mount_html(&mock_server, "/catalogue/b_2/index.html", detail_page("3"), Some(2)).await;

    let dir = TempDir::new().unwrap();

    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    // --fresh re-crawls the same page; the end-of-run dedup collapses the
    // repeated titles back to one row each
    let outcome = run_crawler(create_test_config(&base_url, &dir), true).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "Book A");
    assert_eq!(rows[1][0], "Book B");
}

#[tokio::test]
async fn test_empty_listing_page_continues_to_next() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}/", mock_server.uri());

    // First page has no products but does have a next link
    mount_html(
        &mock_server,
        "/",
        listing_page(&[], Some("catalogue/page-2.html")),
        None,
    )
    .await;
    mount_html(
        &mock_server,
        "/catalogue/page-2.html",
        listing_page(&[("Book C", "£23.88", "Five", "c_3/index.html")], None),
        None,
    )
    .await;
    mount_html(&mock_server, "/catalogue/c_3/index.html", detail_page("7"), None).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawler(create_test_config(&base_url, &dir), false).await;
    assert_eq!(outcome, CrawlOutcome::Finished);

    let (_, rows) = read_csv(&dir.path().join("products.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "Book C");
}
