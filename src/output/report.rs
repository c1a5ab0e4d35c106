//! Cross-agency reconciliation and the final report
//!
//! Titles are often administered jointly. After traversal the report notes,
//! for each agency, which of its titles are also tracked by other agencies.

use crate::state::{AgencyProgress, CrawlProgress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One agency's row of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub agency: String,
    pub word_count: u64,
    pub parts_processed: u64,
    /// Title numbers the agency has an entry for, ascending
    pub titles: Vec<u32>,
    pub shared_regulations: bool,
    /// Empty when nothing is shared
    pub shared_regulations_note: String,
}

/// Builds the inverse index title → agencies that track it
///
/// Agencies appear in each list in iteration order. Titles whose
/// processing is still pending count as tracked.
pub fn title_usage<'a, I>(agencies: I) -> BTreeMap<u32, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a AgencyProgress)>,
{
    let mut usage: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for (name, progress) in agencies {
        for title in progress.titles.keys() {
            let users = usage.entry(*title).or_default();
            if !users.iter().any(|u| u == name) {
                users.push(name.to_string());
            }
        }
    }
    usage
}

/// Reconciles per-agency progress into report rows
///
/// Rows are sorted by word count, descending; agencies with equal counts keep
/// their iteration order.
pub fn reconcile<'a, I>(agencies: I) -> Vec<ReportRow>
where
    I: IntoIterator<Item = (&'a str, &'a AgencyProgress)>,
    I::IntoIter: Clone,
{
    let agencies = agencies.into_iter();
    let usage = title_usage(agencies.clone());

    let mut rows: Vec<ReportRow> = agencies
        .map(|(name, progress)| {
            let titles: Vec<u32> = progress.titles.keys().copied().collect();

            let shared: Vec<(u32, Vec<&str>)> = titles
                .iter()
                .filter_map(|title| {
                    let others: Vec<&str> = usage
                        .get(title)
                        .into_iter()
                        .flatten()
                        .map(String::as_str)
                        .filter(|other| *other != name)
                        .collect();
                    (!others.is_empty()).then_some((*title, others))
                })
                .collect();

            let note = if shared.is_empty() {
                String::new()
            } else {
                let parts: Vec<String> = shared
                    .iter()
                    .map(|(title, others)| {
                        format!("Title {} (shared with {})", title, others.join(", "))
                    })
                    .collect();
                format!(
                    "Shares regulations with other agencies: {}",
                    parts.join("; ")
                )
            };

            ReportRow {
                agency: name.to_string(),
                word_count: progress.word_count,
                parts_processed: progress.completed_parts,
                titles,
                shared_regulations: !shared.is_empty(),
                shared_regulations_note: note,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.word_count.cmp(&a.word_count));
    rows
}

/// Reconciles a whole checkpoint, iterating agencies in selection order
pub fn reconcile_progress(progress: &CrawlProgress) -> Vec<ReportRow> {
    let agencies: Vec<(&str, &AgencyProgress)> = progress
        .agency_names()
        .into_iter()
        .filter_map(|name| {
            progress
                .agencies_progress
                .get(name)
                .map(|agency| (name, agency))
        })
        .collect();

    reconcile(agencies)
}
