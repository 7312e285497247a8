//! Catwalk: a resumable, polite catalog crawler
//!
//! This crate walks a catalog site's paginated listing pages, extracts one
//! record per product, enriches each record from its detail page, and appends
//! results to a CSV file as each page completes. Crawl progress is
//! checkpointed after every page so an interrupted run resumes where it left
//! off instead of starting over.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod record;
pub mod state;

use thiserror::Error;

/// Main error type for Catwalk operations
#[derive(Debug, Error)]
pub enum CatwalkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] state::CheckpointError),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catwalk operations
pub type Result<T> = std::result::Result<T, CatwalkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlOutcome};
pub use record::{ItemRecord, DEDUP_FIELD, UNKNOWN_REVIEWS};
pub use state::{Checkpoint, CheckpointStore, CrawlCursor};
