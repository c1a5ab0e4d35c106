//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::output::ReportRow;
use crate::state::CrawlProgress;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of a crawl checkpoint
///
/// The coordinator calls [`ProgressStore::save`] after every unit of work, so
/// implementations must overwrite the previous snapshot wholesale and never
/// leave a partially written one behind.
pub trait ProgressStore {
    /// Loads the stored checkpoint
    ///
    /// Returns `Ok(None)` when no checkpoint has been written yet. A present
    /// checkpoint is returned verbatim, including in-progress entries.
    fn load(&self) -> StorageResult<Option<CrawlProgress>>;

    /// Persists the checkpoint, stamping `last_save_time` first
    fn save(&mut self, progress: &mut CrawlProgress) -> StorageResult<()>;

    /// Writes the final per-agency report
    fn write_report(&mut self, rows: &[ReportRow]) -> StorageResult<()>;
}
