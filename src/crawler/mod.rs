//! Crawler module for the regulation word census
//!
//! This module contains the core crawling logic, including:
//! - Upstream response schemas and endpoint paths
//! - HTTP fetching with backoff and retry
//! - Word counting of markup payloads
//! - Overall crawl coordination and checkpointing

mod api;
mod coordinator;
mod fetcher;
mod words;

pub use api::{
    full_text_endpoint, structure_endpoint, Agency, AgencyList, CfrReference, StructureNode,
    AGENCIES_ENDPOINT, PART_QUERY,
};
pub use coordinator::{select_agencies, Coordinator};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, RetryPolicy};
pub use words::count_words;
