//! State module for tracking crawl progress
//!
//! The crawl's sole unit of progress is the cursor: the next listing page to
//! fetch, or a terminal marker once every page has been visited. The cursor
//! is persisted to a small JSON checkpoint file after each completed page.

mod checkpoint;

// Re-export main types
pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, CrawlCursor};
