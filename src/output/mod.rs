//! Output module for reports and progress views
//!
//! This module handles:
//! - Reconciling shared titles into the final per-agency report
//! - Rendering the auto-refreshing HTML status page
//! - Projecting checkpoint figures for console output

mod report;
mod stats;
mod status_page;

pub use report::{reconcile, reconcile_progress, title_usage, ReportRow};
pub use stats::{print_progress, print_report, ProgressSummary};
pub use status_page::{escape_html, group_thousands, render_status_page};
