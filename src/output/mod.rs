//! Output module for persisting extracted records
//!
//! Records stream to an append-only CSV store as each page completes, and a
//! final pass collapses duplicate keys once the crawl loop ends.

mod csv_sink;

pub use csv_sink::{CsvSink, SinkError};
