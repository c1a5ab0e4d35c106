//! State module for tracking crawl progress
//!
//! This module provides the checkpoint model that makes a crawl resumable.
//!
//! # Components
//!
//! - `CrawlStatus`: lifecycle of a crawl (initializing, running, completed, ...)
//! - `CrawlProgress`: root checkpoint written after every unit of work
//! - `AgencyProgress`, `TitleProgress`, `PartProgress`: nested completion records

mod crawl_status;
mod progress;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use progress::{AgencyProgress, CrawlProgress, PartProgress, TitleProgress};
