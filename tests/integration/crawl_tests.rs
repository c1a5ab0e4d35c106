//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the eCFR API and drive the full
//! select → traverse → checkpoint → reconcile cycle end-to-end.

use chrono::Utc;
use ecfr_census::config::Config;
use ecfr_census::crawler::{Agency, CfrReference, Coordinator, FetchOutcome, Fetcher, RetryPolicy};
use ecfr_census::output::ReportRow;
use ecfr_census::state::{CrawlProgress, CrawlStatus};
use ecfr_census::storage::{JsonFileStore, ProgressStore, StorageResult};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATE: &str = "2023-01-01";

/// Creates a test configuration pointed at the mock server with no pacing
fn create_test_config(base_url: &str, data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.crawler.pacing_ms = 0;
    config.crawler.max_attempts = 3;
    config.crawler.backoff_base_ms = 1;
    config.crawler.max_jitter_ms = 1;
    config.crawler.error_retry_ms = 1;
    config.output.data_dir = data_dir.to_path_buf();
    config
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff_base: Duration::from_millis(1),
        max_jitter: Duration::from_millis(1),
        error_delay: Duration::from_millis(1),
    }
}

fn agency_json(name: &str, titles: &[u32]) -> serde_json::Value {
    json!({
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "cfr_references": titles.iter().map(|t| json!({"title": t, "chapter": "I"})).collect::<Vec<_>>()
    })
}

fn agency(name: &str, titles: &[u32]) -> Agency {
    Agency {
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        cfr_references: titles
            .iter()
            .map(|t| CfrReference {
                title: Some(*t),
                chapter: Some("I".to_string()),
            })
            .collect(),
    }
}

fn structure_json(title: u32, parts: &[&str]) -> serde_json::Value {
    json!({
        "identifier": title.to_string(),
        "type": "title",
        "children": [{
            "identifier": "I",
            "type": "chapter",
            "children": parts.iter().map(|p| json!({"identifier": p, "type": "part"})).collect::<Vec<_>>()
        }]
    })
}

async fn mount_agencies(server: &MockServer, agencies: serde_json::Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/admin/v1/agencies.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "agencies": agencies })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_structure(server: &MockServer, title: u32, parts: &[&str], expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/versioner/v1/structure/{}/title-{}.json", DATE, title)))
        .respond_with(ResponseTemplate::new(200).set_body_json(structure_json(title, parts)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_part(server: &MockServer, title: u32, part: &str, response: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/versioner/v1/full/{}/title-{}.xml", DATE, title)))
        .and(query_param("part", part))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

fn xml(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<DIV5><P>{}</P></DIV5>", text))
        .insert_header("content-type", "text/xml")
}

/// Store wrapper that records counters at every checkpoint
struct RecordingStore {
    inner: JsonFileStore,
    history: Vec<(usize, u64)>,
}

impl ProgressStore for RecordingStore {
    fn load(&self) -> StorageResult<Option<CrawlProgress>> {
        self.inner.load()
    }

    fn save(&mut self, progress: &mut CrawlProgress) -> StorageResult<()> {
        let parts = progress
            .agencies_progress
            .values()
            .map(|a| a.completed_parts)
            .sum();
        self.history.push((progress.completed_agencies, parts));
        self.inner.save(progress)
    }

    fn write_report(&mut self, rows: &[ReportRow]) -> StorageResult<()> {
        self.inner.write_report(rows)
    }
}

#[tokio::test]
async fn test_full_crawl_two_agencies() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_agencies(
        &server,
        json!([
            agency_json("Board of Two Parts", &[1]),
            agency_json("Single Part Office", &[2]),
            agency_json("Unreferenced Council", &[]),
        ]),
        1,
    )
    .await;
    mount_structure(&server, 1, &["1", "2"], 1).await;
    mount_structure(&server, 2, &["10"], 1).await;
    mount_part(&server, 1, "1", xml("one two three"), 1).await;
    mount_part(&server, 1, "2", xml("four five"), 1).await;
    mount_part(&server, 2, "10", xml("six seven"), 1).await;

    let config = create_test_config(&server.uri(), dir.path());
    let store = RecordingStore {
        inner: JsonFileStore::new(dir.path()),
        history: Vec::new(),
    };

    let mut coordinator = Coordinator::new(config, store, false, None).unwrap();
    let report = coordinator.run(5).await.expect("crawl failed");

    // Only agencies with references are selected
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].agency, "Board of Two Parts");
    assert_eq!(report[0].word_count, 5);
    assert_eq!(report[0].parts_processed, 2);
    assert_eq!(report[0].titles, vec![1]);
    assert_eq!(report[1].agency, "Single Part Office");
    assert_eq!(report[1].word_count, 2);
    assert!(report.iter().all(|r| !r.shared_regulations));
    assert!(report.iter().all(|r| r.shared_regulations_note.is_empty()));

    let progress = coordinator.progress().clone();
    assert_eq!(progress.status, CrawlStatus::Completed);
    assert_eq!(progress.completed_agencies, 2);
    assert_eq!(progress.total_agencies, 2);
    assert!(progress.end_time.is_some());
    assert!(progress
        .agencies_progress
        .values()
        .all(|a| a.completed && a.is_consistent()));

    // Counters never decrease between checkpoints
    let store = coordinator.into_store();
    assert!(store.history.len() >= 5);
    for pair in store.history.windows(2) {
        assert!(pair[1].0 >= pair[0].0);
        assert!(pair[1].1 >= pair[0].1);
    }

    // Files on disk match the in-memory result
    let saved = store.inner.load().unwrap().unwrap();
    assert_eq!(saved.status, CrawlStatus::Completed);
    assert_eq!(store.inner.load_report().unwrap(), Some(report));
    assert!(store.inner.status_path().exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Every endpoint may be hit exactly once across both runs
    mount_agencies(&server, json!([agency_json("Only Agency", &[3])]), 1).await;
    mount_structure(&server, 3, &["1", "2"], 1).await;
    mount_part(&server, 3, "1", xml("a b c"), 1).await;
    mount_part(&server, 3, "2", xml("d e"), 1).await;

    let config = create_test_config(&server.uri(), dir.path());

    let mut first = Coordinator::new(config.clone(), JsonFileStore::new(dir.path()), false, None)
        .unwrap();
    first.run(5).await.unwrap();
    let after_first = first.progress().clone();

    let mut second =
        Coordinator::new(config, JsonFileStore::new(dir.path()), false, None).unwrap();
    let report = second.run(5).await.unwrap();
    let after_second = second.progress().clone();

    assert_eq!(after_first.completed_agencies, after_second.completed_agencies);
    assert_eq!(
        after_first.agencies_progress["Only Agency"].completed_parts,
        after_second.agencies_progress["Only Agency"].completed_parts
    );
    assert_eq!(
        after_first.agencies_progress["Only Agency"].word_count,
        after_second.agencies_progress["Only Agency"].word_count
    );
    assert_eq!(after_second.agencies_progress["Only Agency"].word_count, 5);
    assert_eq!(after_second.status, CrawlStatus::Completed);
    assert_eq!(report[0].parts_processed, 2);
}

#[tokio::test]
async fn test_resume_processes_only_pending_part() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let alpha = agency("Alpha", &[3]);
    let beta = agency("Beta", &[6, 7]);

    let mut progress = CrawlProgress::new(Utc::now());
    progress.status = CrawlStatus::Running;
    progress.set_selection(vec![alpha.clone(), beta.clone()]);
    {
        let a = progress.agency_entry(&alpha);
        a.register_parts(3, ["1"]);
        a.complete_part(3, "1", 20);
        a.title_entry(3).completed = true;
        a.completed = true;
    }
    progress.completed_agencies = 1;
    {
        let b = progress.agency_entry(&beta);
        b.register_parts(6, ["1"]);
        b.complete_part(6, "1", 4);
        b.title_entry(6).completed = true;
        b.register_parts(7, ["1", "2"]);
        b.complete_part(7, "1", 3);
    }
    progress.current_agency = "Beta".to_string();

    let mut store = JsonFileStore::new(dir.path());
    store.save(&mut progress).unwrap();

    // Nothing already completed may be fetched again
    mount_agencies(&server, json!([]), 0).await;
    mount_structure(&server, 3, &["1"], 0).await;
    mount_structure(&server, 6, &["1"], 0).await;
    mount_structure(&server, 7, &["1", "2"], 1).await;
    mount_part(&server, 3, "1", xml("never"), 0).await;
    mount_part(&server, 6, "1", xml("never"), 0).await;
    mount_part(&server, 7, "1", xml("never"), 0).await;
    mount_part(&server, 7, "2", xml("alpha beta gamma"), 1).await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator = Coordinator::new(config, store, false, None).unwrap();
    let report = coordinator.run(5).await.unwrap();

    let resumed = coordinator.progress();
    assert_eq!(resumed.status, CrawlStatus::Completed);
    assert_eq!(resumed.completed_agencies, 2);

    let beta_progress = &resumed.agencies_progress["Beta"];
    assert!(beta_progress.completed);
    assert_eq!(beta_progress.completed_parts, 3);
    assert_eq!(beta_progress.total_parts, 3);
    assert_eq!(beta_progress.word_count, 10);
    assert!(beta_progress.is_consistent());

    assert_eq!(report[0].agency, "Alpha");
    assert_eq!(report[0].word_count, 20);
    assert_eq!(report[1].agency, "Beta");
    assert_eq!(report[1].titles, vec![6, 7]);
}

#[tokio::test]
async fn test_not_found_completes_but_exhaustion_stays_pending() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_agencies(&server, json!([agency_json("Sparse Agency", &[5])]), 1).await;
    mount_structure(&server, 5, &["1", "2"], 1).await;
    mount_part(&server, 5, "1", ResponseTemplate::new(404), 1).await;
    mount_part(&server, 5, "2", ResponseTemplate::new(429), 3).await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator =
        Coordinator::new(config.clone(), JsonFileStore::new(dir.path()), false, None).unwrap();
    coordinator.run(1).await.unwrap();

    let progress = coordinator.progress().clone();
    let store = coordinator.into_store();

    assert_eq!(progress.status, CrawlStatus::Incomplete);
    assert_eq!(progress.completed_agencies, 0);
    let sparse = &progress.agencies_progress["Sparse Agency"];
    assert!(!sparse.completed);
    assert!(!sparse.is_title_complete(5));
    assert!(sparse.is_part_complete(5, "1"));
    assert!(!sparse.is_part_complete(5, "2"));
    assert_eq!(sparse.completed_parts, 1);
    assert_eq!(sparse.total_parts, 2);
    assert_eq!(sparse.word_count, 0);

    // The report is only written once everything completed
    assert!(store.load_report().unwrap().is_none());
    server.verify().await;

    // Upstream recovers: the next run finishes only the pending part
    server.reset().await;
    mount_structure(&server, 5, &["1", "2"], 1).await;
    mount_part(&server, 5, "1", xml("never"), 0).await;
    mount_part(&server, 5, "2", xml("recovered text"), 1).await;

    let mut coordinator = Coordinator::new(config, store, false, None).unwrap();
    let report = coordinator.run(1).await.unwrap();

    assert_eq!(coordinator.progress().status, CrawlStatus::Completed);
    assert!(coordinator.progress().error.is_none());
    assert_eq!(report[0].word_count, 2);
    assert_eq!(report[0].parts_processed, 2);
    assert!(coordinator.into_store().load_report().unwrap().is_some());
}

#[tokio::test]
async fn test_title_without_parts_completes_with_zero() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_agencies(&server, json!([agency_json("Hollow Agency", &[8, 9, 11])]), 1).await;

    // Missing nesting
    Mock::given(method("GET"))
        .and(path(format!("/versioner/v1/structure/{}/title-8.json", DATE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"identifier": "8"})))
        .expect(1)
        .mount(&server)
        .await;

    // Title that does not exist
    Mock::given(method("GET"))
        .and(path(format!("/versioner/v1/structure/{}/title-9.json", DATE)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Body that is not a structure tree at all
    Mock::given(method("GET"))
        .and(path(format!("/versioner/v1/structure/{}/title-11.json", DATE)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator =
        Coordinator::new(config, JsonFileStore::new(dir.path()), false, None).unwrap();
    let report = coordinator.run(1).await.unwrap();

    let progress = coordinator.progress();
    assert_eq!(progress.status, CrawlStatus::Completed);
    let hollow = &progress.agencies_progress["Hollow Agency"];
    assert!(hollow.completed);
    assert!(hollow.is_title_complete(8));
    assert!(hollow.is_title_complete(9));
    assert!(hollow.is_title_complete(11));
    assert_eq!(hollow.total_parts, 0);
    assert_eq!(report[0].word_count, 0);
    assert_eq!(report[0].titles, vec![8, 9, 11]);
}

#[tokio::test]
async fn test_part_identifier_with_reserved_characters() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_agencies(&server, json!([agency_json("Odd Parts Office", &[4])]), 1).await;
    mount_structure(&server, 4, &["12 A&B#c+d"], 1).await;
    mount_part(&server, 4, "12 A&B#c+d", xml("exactly three words"), 1).await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator =
        Coordinator::new(config, JsonFileStore::new(dir.path()), false, None).unwrap();
    let report = coordinator.run(1).await.unwrap();

    assert_eq!(coordinator.progress().status, CrawlStatus::Completed);
    assert!(coordinator.progress().agencies_progress["Odd Parts Office"]
        .is_part_complete(4, "12 A&B#c+d"));
    assert_eq!(report[0].word_count, 3);
}

#[tokio::test]
async fn test_shared_titles_in_report() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_agencies(
        &server,
        json!([
            agency_json("X", &[1, 2]),
            agency_json("Y", &[2, 3]),
            agency_json("Z", &[3]),
        ]),
        1,
    )
    .await;
    // Shared titles are walked once per agency that references them
    mount_structure(&server, 1, &["1"], 1).await;
    mount_structure(&server, 2, &["1"], 2).await;
    mount_structure(&server, 3, &["1"], 2).await;
    mount_part(&server, 1, "1", xml("w"), 1).await;
    mount_part(&server, 2, "1", xml("w w"), 2).await;
    mount_part(&server, 3, "1", xml("w w w"), 2).await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator =
        Coordinator::new(config, JsonFileStore::new(dir.path()), false, None).unwrap();
    let report = coordinator.run(3).await.unwrap();

    let row = |name: &str| report.iter().find(|r| r.agency == name).unwrap().clone();

    assert_eq!(row("X").word_count, 3);
    assert_eq!(row("Y").word_count, 5);
    assert_eq!(row("Z").word_count, 3);
    assert_eq!(report[0].agency, "Y");

    assert_eq!(
        row("X").shared_regulations_note,
        "Shares regulations with other agencies: Title 2 (shared with Y)"
    );
    assert_eq!(
        row("Z").shared_regulations_note,
        "Shares regulations with other agencies: Title 3 (shared with Y)"
    );
    assert!(row("Y").shared_regulations);
}

#[tokio::test]
async fn test_agency_list_failure_records_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/admin/v1/agencies.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut coordinator =
        Coordinator::new(config, JsonFileStore::new(dir.path()), false, None).unwrap();
    let result = coordinator.run(5).await;
    assert!(result.is_err());

    let saved = JsonFileStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(saved.status, CrawlStatus::Error);
    assert!(saved
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("Agency list unavailable"));
    assert!(!saved.has_selection());
}

#[tokio::test]
async fn test_fetcher_rate_limit_budget_exhausts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let policy = fast_policy(4);
    let fetcher = Fetcher::new(reqwest::Client::new(), &server.uri(), policy.clone()).unwrap();

    let started = std::time::Instant::now();
    let outcome = fetcher.fetch_text("busy").await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, FetchOutcome::Exhausted);

    // Backoff floors alone: 1 + 2 + 4 + 8 ms
    let floor: Duration = (0..4).map(|k| policy.rate_limit_delay(k, 0.0)).sum();
    assert!(elapsed >= floor);
}

#[tokio::test]
async fn test_fetcher_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(reqwest::Client::new(), &server.uri(), fast_policy(5)).unwrap();
    assert_eq!(fetcher.fetch_text("missing").await, FetchOutcome::NotFound);
}

#[tokio::test]
async fn test_fetcher_recovers_after_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally here"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(reqwest::Client::new(), &server.uri(), fast_policy(3)).unwrap();
    assert_eq!(
        fetcher.fetch_text("flaky").await,
        FetchOutcome::Found("finally here".to_string())
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_fetcher_json_malformed_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/agencies.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(reqwest::Client::new(), &server.uri(), fast_policy(5)).unwrap();
    let outcome = fetcher
        .fetch_json::<ecfr_census::crawler::AgencyList>("admin/v1/agencies.json")
        .await;
    assert!(matches!(outcome, FetchOutcome::Malformed(_)));
}
