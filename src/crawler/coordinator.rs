//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the other components
//! together: resolving the starting cursor from the checkpoint, fetching and
//! extracting each listing page, enriching every item from its detail page,
//! appending the page's records to the output store, and checkpointing the
//! cursor so a restarted process picks up exactly where this one stopped.

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::extract::{BooksExtractor, PartialItem, SiteExtractor};
use crate::output::CsvSink;
use crate::record::{ItemRecord, DEDUP_FIELD, UNKNOWN_REVIEWS};
use crate::state::{Checkpoint, CheckpointStore, CrawlCursor};
use crate::CatwalkError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// How a crawl run ended.
///
/// All three are clean terminations: whatever was persisted before the end
/// remains valid, and the checkpoint still names the next unprocessed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every listing page was visited
    Finished,

    /// A listing page failed after all retries; the crawl stopped early
    ListingFetchFailed,

    /// A stop was requested and honored at a page boundary
    Interrupted,
}

/// Main crawler coordinator structure
pub struct Coordinator<E: SiteExtractor> {
    base_url: String,
    fetcher: Fetcher,
    extractor: E,
    checkpoints: CheckpointStore,
    sink: CsvSink,
    fresh: bool,
    shutdown: Arc<AtomicBool>,
}

impl<E: SiteExtractor> Coordinator<E> {
    /// Creates a new coordinator instance
    ///
    /// Opens the output store (creating the CSV and its header if needed)
    /// and the checkpoint store. Failures here are setup failures - the one
    /// class of error that should abort the process.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `extractor` - Site-specific extraction strategy
    /// * `fresh` - Whether to ignore an existing checkpoint and start over
    pub fn new(config: Config, extractor: E, fresh: bool) -> Result<Self, CatwalkError> {
        let fetcher = Fetcher::new(&config.crawler, &config.user_agent)?;
        let sink = CsvSink::new(&config.output.csv_path)?;
        let checkpoints = CheckpointStore::new(&config.output.checkpoint_path);

        Ok(Self {
            base_url: config.crawler.base_url,
            fetcher,
            extractor,
            checkpoints,
            sink,
            fresh,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that requests a stop at the next page boundary.
    ///
    /// The page currently in flight still completes its persist and
    /// checkpoint steps before the loop exits.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the crawl loop to one of its terminal outcomes.
    ///
    /// Mid-crawl failures never escape this method: a permanent listing
    /// fetch failure ends the loop early, and everything else (enrichment
    /// failures, persistence errors) is absorbed per item or per page.
    pub async fn run(&mut self) -> CrawlOutcome {
        let mut cursor = self.resolve_start_cursor();
        let mut pages_completed: u32 = 0;

        let outcome = loop {
            let page_url = match &cursor {
                CrawlCursor::Done => {
                    tracing::info!("No next page; crawl finished after {} pages", pages_completed);
                    break CrawlOutcome::Finished;
                }
                CrawlCursor::Next(url) => url.clone(),
            };

            if self.shutdown.load(Ordering::Relaxed) {
                tracing::warn!("Stop requested; crawl interrupted with progress checkpointed");
                break CrawlOutcome::Interrupted;
            }

            tracing::info!("Processing page: {}", page_url);

            let page_url = match Url::parse(&page_url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Cursor '{}' is not a valid URL: {}", page_url, e);
                    break CrawlOutcome::ListingFetchFailed;
                }
            };

            // FetchingListing
            let (final_url, body) = match self.fetcher.fetch(&page_url).await {
                FetchResult::Success { final_url, body } => (final_url, body),
                FetchResult::Failed { attempts, error } => {
                    tracing::error!(
                        "Giving up on listing page {} after {} attempts: {}",
                        page_url,
                        attempts,
                        error
                    );
                    break CrawlOutcome::ListingFetchFailed;
                }
            };

            // ExtractingListing
            let listing = self.extractor.extract_listing(&body, &final_url);
            if listing.items.is_empty() {
                tracing::info!("No products found on page: {}", final_url);
            }

            // EnrichingItems
            let mut records = Vec::with_capacity(listing.items.len());
            for item in listing.items {
                records.push(self.enrich(item, &final_url).await);
            }

            // PersistingPage
            pages_completed += 1;
            match self.sink.append_page(&records) {
                Ok(()) => {
                    tracing::info!("Appended {} rows from page {}", records.len(), pages_completed);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to append page {} to {}; rows are lost and a resume will not recover them: {}",
                        pages_completed,
                        self.sink.path().display(),
                        e
                    );
                }
            }

            // CheckpointingCursor
            let checkpoint = Checkpoint {
                cursor: listing.next.clone(),
            };
            if let Err(e) = self.checkpoints.save(&checkpoint) {
                tracing::error!(
                    "Failed to save checkpoint to {}; a restart will repeat already-crawled pages: {}",
                    self.checkpoints.path().display(),
                    e
                );
            }

            cursor = listing.next;
        };

        if outcome != CrawlOutcome::Interrupted {
            self.deduplicate_output();
        }

        outcome
    }

    /// Resolves where the crawl starts: the checkpointed cursor, or the
    /// configured base URL when no checkpoint exists (or `--fresh` asked to
    /// ignore one). An unreadable checkpoint degrades to a fresh start.
    fn resolve_start_cursor(&self) -> CrawlCursor {
        if self.fresh {
            tracing::info!("Ignoring existing checkpoint (fresh crawl)");
            return CrawlCursor::Next(self.base_url.clone());
        }

        match self.checkpoints.load() {
            Ok(Some(checkpoint)) => {
                match &checkpoint.cursor {
                    CrawlCursor::Next(url) => tracing::info!("Resuming from checkpoint: {}", url),
                    CrawlCursor::Done => tracing::info!("Checkpoint is terminal; nothing to crawl"),
                }
                checkpoint.cursor
            }
            Ok(None) => CrawlCursor::Next(self.base_url.clone()),
            Err(e) => {
                tracing::warn!("Failed to load checkpoint, starting fresh: {}", e);
                CrawlCursor::Next(self.base_url.clone())
            }
        }
    }

    /// Builds the output record for one listing item, fetching its detail
    /// page for the supplemental fields.
    ///
    /// Never fails: an unresolvable link or a permanently failed detail
    /// fetch degrades the supplemental fields to the unknown sentinel and
    /// the item keeps its listing-page data.
    async fn enrich(&self, item: PartialItem, page_url: &Url) -> ItemRecord {
        let product_url = match page_url.join(&item.detail_href) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    "Unresolvable detail link '{}' on {}: {}",
                    item.detail_href,
                    page_url,
                    e
                );
                return ItemRecord {
                    title: item.title,
                    price: item.price,
                    rating: item.rating,
                    number_of_reviews: UNKNOWN_REVIEWS,
                    product_page_url: item.detail_href,
                    scraped_at: Utc::now(),
                };
            }
        };

        let number_of_reviews = match self.fetcher.fetch(&product_url).await {
            FetchResult::Success { body, .. } => {
                self.extractor.extract_detail(&body).number_of_reviews
            }
            FetchResult::Failed { attempts, error } => {
                tracing::warn!(
                    "Could not retrieve product page {} after {} attempts: {}",
                    product_url,
                    attempts,
                    error
                );
                UNKNOWN_REVIEWS
            }
        };

        ItemRecord {
            title: item.title,
            price: item.price,
            rating: item.rating,
            number_of_reviews,
            product_page_url: product_url.to_string(),
            scraped_at: Utc::now(),
        }
    }

    /// Final first-seen dedup over the whole output store.
    fn deduplicate_output(&self) {
        tracing::info!("Deduplicating output by {}", DEDUP_FIELD);
        match self.sink.deduplicate(DEDUP_FIELD) {
            Ok(kept) => tracing::info!("Dedup complete; {} rows kept", kept),
            Err(e) => tracing::error!("Failed to deduplicate output store: {}", e),
        }
    }
}

/// Runs a complete crawl with the books catalog extractor
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to ignore an existing checkpoint
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The crawl reached a terminal outcome
/// * `Err(CatwalkError)` - Setup failed before any page was fetched
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlOutcome, CatwalkError> {
    let mut coordinator = Coordinator::new(config, BooksExtractor::new(), fresh)?;
    Ok(coordinator.run().await)
}
