//! Progress projection and console output
//!
//! This module turns a stored checkpoint into the summary figures shown by
//! `--status`, and prints report rows to stdout.

use crate::output::report::ReportRow;
use crate::output::status_page::group_thousands;
use crate::state::{CrawlProgress, CrawlStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read-only projection of a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub status: CrawlStatus,
    pub percent_complete: u32,
    pub current_agency: String,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub total_agencies: usize,
    pub completed_agencies: usize,
    pub elapsed_minutes: i64,
    pub total_words: u64,
    pub error: Option<String>,
}

impl ProgressSummary {
    /// Builds the projection
    ///
    /// Elapsed time runs to `now` while the crawl is live and to `endTime`
    /// once it has finished.
    pub fn from_progress(progress: &CrawlProgress, now: DateTime<Utc>) -> Self {
        let until = if progress.status.is_finished() {
            progress.end_time.unwrap_or(now)
        } else {
            now
        };

        Self {
            status: progress.status,
            percent_complete: progress.percent_complete(),
            current_agency: progress.current_agency.clone(),
            start_time: progress.start_time,
            last_update_time: progress.last_save_time,
            total_agencies: progress.total_agencies,
            completed_agencies: progress.completed_agencies,
            elapsed_minutes: progress.elapsed_minutes(until),
            total_words: progress.total_words(),
            error: progress.error.clone(),
        }
    }
}

/// Prints a checkpoint summary and per-agency breakdown to stdout
pub fn print_progress(progress: &CrawlProgress, now: DateTime<Utc>) {
    let summary = ProgressSummary::from_progress(progress, now);

    println!("=== Word Count Progress ===\n");
    println!("Status: {}", summary.status.label());
    if let Some(error) = &summary.error {
        println!("Error: {}", error);
    }
    println!(
        "Agencies completed: {} / {} ({}%)",
        summary.completed_agencies, summary.total_agencies, summary.percent_complete
    );
    if !summary.current_agency.is_empty() {
        println!("Current agency: {}", summary.current_agency);
    }
    println!("Elapsed: {} minutes", summary.elapsed_minutes);
    println!("Words counted: {}", group_thousands(summary.total_words));
    println!();

    println!("Agencies:");
    for name in progress.agency_names() {
        if let Some(agency) = progress.agencies_progress.get(name) {
            let marker = if agency.completed { "✓" } else { " " };
            println!(
                "  [{}] {}: {} words, {} / {} parts ({}%)",
                marker,
                name,
                group_thousands(agency.word_count),
                agency.completed_parts,
                agency.total_parts,
                agency.percent_complete()
            );
        }
    }
}

/// Prints report rows as an aligned table
pub fn print_report(rows: &[ReportRow]) {
    println!("=== Word Count Report ===\n");

    let width = rows.iter().map(|r| r.agency.len()).max().unwrap_or(6).max(6);
    println!("{:<width$}  {:>12}  {:>6}", "Agency", "Words", "Parts", width = width);

    for row in rows {
        println!(
            "{:<width$}  {:>12}  {:>6}",
            row.agency,
            group_thousands(row.word_count),
            row.parts_processed,
            width = width
        );
        if row.shared_regulations {
            println!("  {}", row.shared_regulations_note);
        }
    }
}
