//! Checkpoint records for a crawl
//!
//! `CrawlProgress` is the root of the checkpoint written after every unit of
//! work. It owns one `AgencyProgress` per agency, which owns one
//! `TitleProgress` per CFR title, which owns one `PartProgress` per
//! structural part. Counters on `AgencyProgress` only move through
//! [`AgencyProgress::register_parts`] and [`AgencyProgress::complete_part`],
//! which keeps them equal to what the nested records say.

use crate::crawler::Agency;
use crate::state::CrawlStatus;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root checkpoint object, persisted as a whole on every update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub status: CrawlStatus,

    /// Selected agencies; `None` until the one-time selection is made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agencies: Option<Vec<Agency>>,

    #[serde(default)]
    pub total_agencies: usize,

    #[serde(default)]
    pub completed_agencies: usize,

    /// Agency under active processing (empty before the first one)
    #[serde(default)]
    pub current_agency: String,

    /// Keyed by agency name, in the order agencies were first processed
    #[serde(default)]
    pub agencies_progress: IndexMap<String, AgencyProgress>,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_save_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Failure description, present only when status is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Hash of the configuration file the crawl was started with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl CrawlProgress {
    /// Creates a fresh checkpoint in the `initializing` state
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            status: CrawlStatus::Initializing,
            agencies: None,
            total_agencies: 0,
            completed_agencies: 0,
            current_agency: String::new(),
            agencies_progress: IndexMap::new(),
            start_time: Some(start_time),
            last_save_time: None,
            end_time: None,
            error: None,
            config_hash: None,
        }
    }

    /// Returns true once the agency selection has been persisted
    pub fn has_selection(&self) -> bool {
        self.agencies.is_some()
    }

    /// Records the one-time agency selection
    pub fn set_selection(&mut self, agencies: Vec<Agency>) {
        self.total_agencies = agencies.len();
        self.agencies = Some(agencies);
    }

    /// Returns the progress record for an agency, creating it on first sight
    pub fn agency_entry(&mut self, agency: &Agency) -> &mut AgencyProgress {
        self.agencies_progress
            .entry(agency.name.clone())
            .or_insert_with(|| AgencyProgress::new(&agency.slug))
    }

    /// Agency names in selection order, followed by any tracked agency the
    /// selection does not list
    pub fn agency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .agencies
            .iter()
            .flatten()
            .map(|a| a.name.as_str())
            .filter(|name| self.agencies_progress.contains_key(*name))
            .collect();

        for name in self.agencies_progress.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }

        names
    }

    /// Percent of selected agencies completed, rounded to the nearest integer
    pub fn percent_complete(&self) -> u32 {
        percent(self.completed_agencies as u64, self.total_agencies as u64)
    }

    /// Sum of word counts across all tracked agencies
    pub fn total_words(&self) -> u64 {
        self.agencies_progress.values().map(|a| a.word_count).sum()
    }

    /// Whole minutes elapsed since the crawl started
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.start_time
            .map(|start| ((now - start).num_seconds() as f64 / 60.0).round() as i64)
            .unwrap_or(0)
    }
}

/// Per-agency progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyProgress {
    #[serde(default)]
    pub completed_parts: u64,

    #[serde(default)]
    pub total_parts: u64,

    #[serde(default)]
    pub word_count: u64,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub titles: BTreeMap<u32, TitleProgress>,
}

impl AgencyProgress {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            ..Default::default()
        }
    }

    /// Returns the progress record for a title, creating it on first sight
    pub fn title_entry(&mut self, title: u32) -> &mut TitleProgress {
        self.titles.entry(title).or_default()
    }

    /// Tracks the given parts under a title
    ///
    /// Only parts not already tracked are added and counted toward
    /// `total_parts`, so enumerating the same title twice is harmless.
    /// Returns the number of newly tracked parts.
    pub fn register_parts<'a, I>(&mut self, title: u32, part_ids: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let title_progress = self.titles.entry(title).or_default();
        let mut added = 0;

        for id in part_ids {
            if !title_progress.parts.contains_key(id) {
                title_progress
                    .parts
                    .insert(id.to_string(), PartProgress::default());
                added += 1;
            }
        }

        self.total_parts += added;
        added
    }

    /// Marks a part complete with its word count
    ///
    /// Returns false without touching any counter if the part was already
    /// complete. A part not yet registered is registered first.
    pub fn complete_part(&mut self, title: u32, part_id: &str, word_count: u64) -> bool {
        if self.is_part_complete(title, part_id) {
            return false;
        }

        self.register_parts(title, [part_id]);

        if let Some(part) = self
            .titles
            .get_mut(&title)
            .and_then(|t| t.parts.get_mut(part_id))
        {
            part.completed = true;
            part.word_count = word_count;
        }

        self.completed_parts += 1;
        self.word_count += word_count;
        true
    }

    pub fn is_title_complete(&self, title: u32) -> bool {
        self.titles.get(&title).is_some_and(|t| t.completed)
    }

    pub fn is_part_complete(&self, title: u32, part_id: &str) -> bool {
        self.titles
            .get(&title)
            .and_then(|t| t.parts.get(part_id))
            .is_some_and(|p| p.completed)
    }

    /// Percent of tracked parts completed, rounded to the nearest integer
    pub fn percent_complete(&self) -> u32 {
        percent(self.completed_parts, self.total_parts)
    }

    /// Checks the counter invariants against the nested records
    pub fn is_consistent(&self) -> bool {
        let completed: Vec<&PartProgress> = self
            .titles
            .values()
            .flat_map(|t| t.parts.values())
            .filter(|p| p.completed)
            .collect();

        self.completed_parts <= self.total_parts
            && self.completed_parts == completed.len() as u64
            && self.word_count == completed.iter().map(|p| p.word_count).sum::<u64>()
    }
}

/// Per-title progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleProgress {
    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub parts: BTreeMap<String, PartProgress>,
}

/// Per-part progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartProgress {
    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub word_count: u64,
}

fn percent(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}
