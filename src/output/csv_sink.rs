//! Append-only CSV output store
//!
//! Rows stream in one page at a time while the crawl runs; the header is
//! written exactly once, when the store is created. A crawl that revisits a
//! page (after an interrupted run, say) appends duplicate rows - the final
//! deduplication pass collapses them to the first-seen row per key.

use crate::record::ItemRecord;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output store errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{0}' missing from output header")]
    MissingKeyColumn(String),
}

/// Appends extracted records to a CSV file and deduplicates it at the end
/// of a run.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Opens the sink, creating the file and writing its header if the file
    /// is absent or empty.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let sink = Self { path: path.into() };
        sink.ensure_header()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_header(&self) -> Result<(), SinkError> {
        let has_rows = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len() > 0,
            Err(_) => false,
        };
        if has_rows {
            return Ok(());
        }

        let mut writer = csv::Writer::from_writer(File::create(&self.path)?);
        writer.write_record(ItemRecord::FIELDS)?;
        writer.flush()?;
        Ok(())
    }

    /// Appends one page's records, in encounter order, and flushes.
    ///
    /// The flush must complete before the caller checkpoints past this page.
    pub fn append_page(&self, records: &[ItemRecord]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Rewrites the store keeping the first-seen row per `key_field` value.
    ///
    /// Order and field values of surviving rows are preserved. Rows whose
    /// key is empty are dropped. A store that is absent or holds only its
    /// header is left as-is. Returns the number of surviving rows.
    pub fn deduplicate(&self, key_field: &str) -> Result<usize, SinkError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let key_index = headers
            .iter()
            .position(|h| h == key_field)
            .ok_or_else(|| SinkError::MissingKeyColumn(key_field.to_string()))?;

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for result in reader.records() {
            let row = result?;
            let key = row.get(key_index).unwrap_or("");
            if key.is_empty() {
                continue;
            }
            if seen.insert(key.to_string()) {
                kept.push(row);
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            writer.write_record(&headers)?;
            for row in &kept {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(kept.len())
    }
}
