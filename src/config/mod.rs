//! Configuration module for the census
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every field has a default, so running without a file is the common case.
//!
//! # Example
//!
//! ```no_run
//! use ecfr_census::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("census.toml")).unwrap();
//! println!("Reference date: {}", config.api.reference_date);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AgencyOrder, ApiConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
