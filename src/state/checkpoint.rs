//! Durable crawl progress: the cursor and its on-disk checkpoint.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where the crawl resumes: the next listing page to fetch, or done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlCursor {
    /// URL of the next unprocessed listing page
    Next(String),

    /// The crawl has visited every listing page
    Done,
}

impl CrawlCursor {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The URL to fetch next, if any.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Next(url) => Some(url),
            Self::Done => None,
        }
    }
}

/// Durable record of the crawl cursor.
///
/// Written after every page, read once at startup. The cursor always names
/// the next page whose items have NOT yet been appended to the output store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub cursor: CrawlCursor,
}

/// Wire format: `{"next_url": "<url>"}` while pages remain,
/// `{"next_url": null}` once the crawl is complete.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    next_url: Option<String>,
}

impl From<&Checkpoint> for CheckpointFile {
    fn from(checkpoint: &Checkpoint) -> Self {
        CheckpointFile {
            next_url: checkpoint.cursor.as_url().map(str::to_string),
        }
    }
}

impl From<CheckpointFile> for Checkpoint {
    fn from(file: CheckpointFile) -> Self {
        Checkpoint {
            cursor: match file.next_url {
                Some(url) => CrawlCursor::Next(url),
                None => CrawlCursor::Done,
            },
        }
    }
}

/// Checkpoint persistence errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed checkpoint file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Reads and writes the checkpoint file.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, or `None` if no checkpoint file exists yet.
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let file: CheckpointFile = serde_json::from_str(&content)?;
        Ok(Some(file.into()))
    }

    /// Saves the checkpoint, replacing any previous one.
    ///
    /// Writes a sibling temp file first and renames it over the target, so a
    /// crash mid-write cannot leave a torn checkpoint. The caller must have
    /// flushed the output store before saving (the cursor must never point
    /// past rows that are not yet durable).
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let content = serde_json::to_string_pretty(&CheckpointFile::from(checkpoint))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}
