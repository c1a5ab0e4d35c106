//! Storage module for persisting crawl checkpoints
//!
//! This module handles all durable state for the crawler, including:
//! - Loading and saving the crawl checkpoint
//! - Regenerating the human-readable status page on every save
//! - Writing the final report

mod json_store;
mod traits;

pub use json_store::{JsonFileStore, PROGRESS_FILE, REPORT_FILE, STATUS_FILE};
pub use traits::{ProgressStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the file store rooted at a data directory
pub fn open_storage(dir: &Path) -> JsonFileStore {
    JsonFileStore::new(dir)
}
