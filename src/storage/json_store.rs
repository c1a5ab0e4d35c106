//! JSON file storage implementation
//!
//! A data directory holds three files:
//! - `progress.json`: the checkpoint, replaced atomically on every save
//! - `status.html`: auto-refreshing status page rendered from each checkpoint
//! - `word_count_report.json`: the final report

use crate::output::{render_status_page, ReportRow};
use crate::state::CrawlProgress;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROGRESS_FILE: &str = "progress.json";
pub const STATUS_FILE: &str = "status.html";
pub const REPORT_FILE: &str = "word_count_report.json";

/// File-backed checkpoint store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir.join(PROGRESS_FILE)
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join(STATUS_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Reads a previously written report, if any
    pub fn load_report(&self) -> StorageResult<Option<Vec<ReportRow>>> {
        let path = self.report_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))
    }

    /// Writes `content` to `path` through a sibling temp file and a rename
    fn write_atomic(&self, path: &Path, content: &[u8]) -> StorageResult<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| io_error(path, e))
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> StorageResult<Option<CrawlProgress>> {
        let path = self.progress_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn save(&mut self, progress: &mut CrawlProgress) -> StorageResult<()> {
        self.ensure_dir()?;

        let now = Utc::now();
        progress.last_save_time = Some(now);

        let json = serde_json::to_vec_pretty(progress)?;
        self.write_atomic(&self.progress_path(), &json)?;

        let html = render_status_page(progress, now);
        let status_path = self.status_path();
        fs::write(&status_path, html).map_err(|e| io_error(&status_path, e))?;

        tracing::trace!("Checkpoint saved to {}", self.progress_path().display());
        Ok(())
    }

    fn write_report(&mut self, rows: &[ReportRow]) -> StorageResult<()> {
        self.ensure_dir()?;
        let json = serde_json::to_vec_pretty(rows)?;
        self.write_atomic(&self.report_path(), &json)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
