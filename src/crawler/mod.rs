//! Crawler module for page fetching and crawl coordination
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and polite pacing
//! - The page-by-page crawl loop with resume and checkpointing
//! - Per-item detail-page enrichment

mod coordinator;
mod fetcher;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, format_user_agent, FetchError, FetchResult, Fetcher};

use crate::config::Config;
use crate::CatwalkError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the output store and checkpoint store
/// 2. Resolve the starting cursor (checkpoint or base URL)
/// 3. Walk the listing pages, enriching and persisting as it goes
/// 4. Deduplicate the output store once the crawl loop ends
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to ignore an existing checkpoint
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - How the crawl ended
/// * `Err(CatwalkError)` - Setup failed
pub async fn crawl(config: Config, fresh: bool) -> Result<CrawlOutcome, CatwalkError> {
    run_crawl(config, fresh).await
}
