//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that walks agency → title → part,
//! including:
//! - Initializing or resuming the checkpoint
//! - Making the one-time agency selection
//! - Fetching structure trees and part texts, counting words
//! - Checkpointing after every unit of work and pacing requests
//! - Reconciling shared titles and writing the final report
//!
//! The walk is strictly sequential. A unit (title or part) is marked complete
//! only after its fetch and count have finished, and only when the upstream
//! answered with content or a definitive 404. Units whose fetch exhausted the
//! retry budget stay pending and are picked up by the next run.

use crate::config::{validate, AgencyOrder, Config};
use crate::crawler::api::{
    full_text_endpoint, structure_endpoint, Agency, AgencyList, StructureNode, AGENCIES_ENDPOINT,
    PART_QUERY,
};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::words::count_words;
use crate::output::{reconcile_progress, ReportRow};
use crate::state::{AgencyProgress, CrawlProgress, CrawlStatus};
use crate::storage::ProgressStore;
use crate::CensusError;
use chrono::Utc;
use std::time::Duration;

/// Main crawler coordinator structure
///
/// The coordinator is the sole owner of the checkpoint; every mutation goes
/// through it and is followed by a save.
pub struct Coordinator<S: ProgressStore> {
    config: Config,
    store: S,
    fetcher: Fetcher,
    progress: CrawlProgress,
}

impl<S: ProgressStore> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `store` - Where checkpoints are loaded from and saved to
    /// * `fresh` - Ignore any stored checkpoint and start over
    /// * `config_hash` - Hash of the configuration file, if one was used
    pub fn new(
        config: Config,
        store: S,
        fresh: bool,
        config_hash: Option<String>,
    ) -> Result<Self, CensusError> {
        validate(&config)?;
        let fetcher = Fetcher::from_config(&config)?;

        let stored = if fresh { None } else { store.load()? };

        let progress = match stored {
            Some(mut progress) => {
                tracing::info!(
                    "Resuming previous run ({} / {} agencies completed)",
                    progress.completed_agencies,
                    progress.total_agencies
                );

                if let (Some(stored_hash), Some(hash)) = (&progress.config_hash, &config_hash) {
                    if stored_hash != hash {
                        tracing::warn!(
                            "Configuration changed since the crawl started; keeping the original agency selection"
                        );
                    }
                }
                if progress.config_hash.is_none() {
                    progress.config_hash = config_hash;
                }
                progress
            }
            None => {
                if fresh {
                    tracing::info!("Starting fresh crawl (ignoring previous state)");
                } else {
                    tracing::info!("No previous progress found, starting new crawl");
                }
                let mut progress = CrawlProgress::new(Utc::now());
                progress.config_hash = config_hash;
                progress
            }
        };

        Ok(Self {
            config,
            store,
            fetcher,
            progress,
        })
    }

    /// The current checkpoint
    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    /// Consumes the coordinator, returning its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the crawl to the end of the selected agencies
    ///
    /// Returns the reconciled report. The report file is written only when
    /// every agency completed; otherwise the checkpoint ends `incomplete` and
    /// a later run resumes the pending units. Any error marks the checkpoint
    /// `error` before it is returned.
    pub async fn run(&mut self, agency_count: usize) -> Result<Vec<ReportRow>, CensusError> {
        match self.run_inner(agency_count).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Error running word count: {}", e);
                self.progress.status = CrawlStatus::Error;
                self.progress.error = Some(e.to_string());
                self.progress.end_time = Some(Utc::now());
                if let Err(save_err) = self.store.save(&mut self.progress) {
                    tracing::error!("Failed to record error state: {}", save_err);
                }
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, agency_count: usize) -> Result<Vec<ReportRow>, CensusError> {
        let start = std::time::Instant::now();

        self.progress.status = CrawlStatus::Running;
        self.progress.error = None;
        self.progress.end_time = None;
        self.checkpoint()?;

        if !self.progress.has_selection() {
            let selected = self.fetch_selection(agency_count).await?;
            tracing::info!(
                "Selected {} agencies: {}",
                selected.len(),
                selected
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            self.progress.set_selection(selected);
            self.checkpoint()?;
        } else if self.progress.total_agencies != agency_count {
            tracing::info!(
                "Keeping the existing selection of {} agencies",
                self.progress.total_agencies
            );
        }

        let agencies = self.progress.agencies.clone().unwrap_or_default();
        for agency in &agencies {
            self.process_agency(agency).await?;
        }

        let report = reconcile_progress(&self.progress);

        if self.progress.completed_agencies >= self.progress.total_agencies {
            self.store.write_report(&report)?;
            self.progress.status = CrawlStatus::Completed;
            tracing::info!(
                "Word count complete! {} agencies in {:?}",
                self.progress.total_agencies,
                start.elapsed()
            );
        } else {
            self.progress.status = CrawlStatus::Incomplete;
            tracing::warn!(
                "Crawl finished with pending work: {} / {} agencies completed; rerun to resume",
                self.progress.completed_agencies,
                self.progress.total_agencies
            );
        }

        self.progress.end_time = Some(Utc::now());
        self.checkpoint()?;

        Ok(report)
    }

    /// Fetches the agency listing and picks the target agencies
    async fn fetch_selection(&self, agency_count: usize) -> Result<Vec<Agency>, CensusError> {
        tracing::info!("Getting all agencies...");

        let list = match self.fetcher.fetch_json::<AgencyList>(AGENCIES_ENDPOINT).await {
            FetchOutcome::Found(list) => list,
            FetchOutcome::NotFound => {
                return Err(CensusError::AgencyListUnavailable(
                    "agency listing returned 404".to_string(),
                ))
            }
            FetchOutcome::Exhausted => {
                return Err(CensusError::AgencyListUnavailable(
                    "retries exhausted".to_string(),
                ))
            }
            FetchOutcome::Malformed(reason) => {
                return Err(CensusError::AgencyListUnavailable(reason));
            }
        };

        Ok(select_agencies(
            list.agencies,
            agency_count,
            self.config.crawler.order,
        ))
    }

    /// Processes every pending title of one agency
    async fn process_agency(&mut self, agency: &Agency) -> Result<(), CensusError> {
        self.progress.current_agency = agency.name.clone();

        if self.agency_progress(agency).completed {
            tracing::debug!("Agency {} already completed, skipping", agency.name);
            return Ok(());
        }

        tracing::info!("Processing agency: {}", agency.name);

        let mut pending = 0;
        for title in agency.title_numbers() {
            if self.agency_progress(agency).is_title_complete(title) {
                tracing::debug!(
                    "Title {} already processed for {}, skipping",
                    title,
                    agency.name
                );
                continue;
            }

            if !self.process_title(agency, title).await? {
                pending += 1;
            }
        }

        if pending > 0 {
            tracing::warn!(
                "Agency {} has {} pending title(s), leaving it for the next run",
                agency.name,
                pending
            );
            return Ok(());
        }

        self.agency_progress(agency).completed = true;
        self.progress.completed_agencies += 1;
        self.checkpoint()?;

        let words = self.agency_progress(agency).word_count;
        tracing::info!("Agency {} completed: {} words", agency.name, words);
        Ok(())
    }

    /// Processes every pending part of one title
    ///
    /// Returns whether the title is now complete.
    async fn process_title(&mut self, agency: &Agency, title: u32) -> Result<bool, CensusError> {
        tracing::info!("Getting structure for title {}", title);
        self.agency_progress(agency).title_entry(title);

        let endpoint = structure_endpoint(&self.config.api.reference_date, title);
        let part_ids = match self.fetcher.fetch_json::<StructureNode>(&endpoint).await {
            FetchOutcome::Found(tree) => tree.part_identifiers(),
            FetchOutcome::NotFound | FetchOutcome::Malformed(_) => None,
            FetchOutcome::Exhausted => {
                tracing::warn!("Structure for title {} unavailable, leaving it pending", title);
                self.checkpoint()?;
                return Ok(false);
            }
        };

        let Some(part_ids) = part_ids else {
            tracing::info!("No parts found for title {}", title);
            self.agency_progress(agency).title_entry(title).completed = true;
            self.checkpoint()?;
            return Ok(true);
        };

        let added = self
            .agency_progress(agency)
            .register_parts(title, part_ids.iter().map(String::as_str));
        tracing::debug!(
            "Title {} has {} parts ({} newly tracked)",
            title,
            part_ids.len(),
            added
        );
        self.checkpoint()?;

        let mut pending = 0;
        for part_id in &part_ids {
            if self.agency_progress(agency).is_part_complete(title, part_id) {
                tracing::debug!(
                    "Part {} already processed for title {}, skipping",
                    part_id,
                    title
                );
                continue;
            }

            if !self.process_part(agency, title, part_id).await? {
                pending += 1;
            }

            tokio::time::sleep(self.pacing()).await;
        }

        if pending > 0 {
            tracing::warn!("Title {} has {} pending part(s)", title, pending);
            return Ok(false);
        }

        self.agency_progress(agency).title_entry(title).completed = true;
        self.checkpoint()?;
        Ok(true)
    }

    /// Fetches and counts one part
    ///
    /// Returns whether the part is now complete.
    async fn process_part(
        &mut self,
        agency: &Agency,
        title: u32,
        part_id: &str,
    ) -> Result<bool, CensusError> {
        tracing::debug!("Processing title {}, part {}", title, part_id);

        let endpoint = full_text_endpoint(&self.config.api.reference_date, title);
        let words = match self
            .fetcher
            .fetch_text_with_query(&endpoint, &[(PART_QUERY, part_id)])
            .await
        {
            FetchOutcome::Found(xml) => {
                let words = count_words(&xml) as u64;
                tracing::info!("Title {}, part {}: {} words", title, part_id, words);
                words
            }
            FetchOutcome::NotFound => {
                tracing::info!(
                    "Title {}, part {} does not exist, counting 0 words",
                    title,
                    part_id
                );
                0
            }
            FetchOutcome::Exhausted | FetchOutcome::Malformed(_) => {
                tracing::warn!(
                    "Title {}, part {} unavailable, leaving it pending",
                    title,
                    part_id
                );
                return Ok(false);
            }
        };

        self.agency_progress(agency)
            .complete_part(title, part_id, words);
        self.checkpoint()?;
        Ok(true)
    }

    fn agency_progress(&mut self, agency: &Agency) -> &mut AgencyProgress {
        self.progress.agency_entry(agency)
    }

    fn pacing(&self) -> Duration {
        self.config.crawler.pacing()
    }

    fn checkpoint(&mut self) -> Result<(), CensusError> {
        self.store.save(&mut self.progress)?;
        Ok(())
    }
}

/// Picks the target agencies from the full listing
///
/// Agencies without CFR references are dropped, the rest are ordered by
/// reference count (stable, so ties keep listing order), duplicates by name
/// are dropped, and the first `count` are taken.
pub fn select_agencies(agencies: Vec<Agency>, count: usize, order: AgencyOrder) -> Vec<Agency> {
    let mut candidates: Vec<Agency> = agencies
        .into_iter()
        .filter(|a| !a.cfr_references.is_empty())
        .collect();

    match order {
        AgencyOrder::Smallest => candidates.sort_by_key(|a| a.cfr_references.len()),
        AgencyOrder::Largest => {
            candidates.sort_by(|a, b| b.cfr_references.len().cmp(&a.cfr_references.len()))
        }
    }

    let mut selected: Vec<Agency> = Vec::with_capacity(count);
    for agency in candidates {
        if selected.len() == count {
            break;
        }
        if !selected.iter().any(|s| s.name == agency.name) {
            selected.push(agency);
        }
    }
    selected
}
