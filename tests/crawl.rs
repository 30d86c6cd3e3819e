//! End-to-end crawl behaviour against a scripted site.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use graph_crawler::engine::{Crawler, GraphSnapshot, interrupt};
use graph_crawler::error::{AppError, FetchError};
use graph_crawler::models::{Config, Edge};
use graph_crawler::pipeline::crawl_and_persist;
use graph_crawler::services::{Fetcher, LinkExtractor};
use graph_crawler::storage::{EdgeStore, JsonEdgeStore, LocalStorage, MemoryEdgeStore};

const SITE: &str = "https://site.test";

fn url(path: &str) -> String {
    format!("{SITE}/{path}")
}

/// Serves pages whose body is one outgoing link per line.
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, Vec<String>>,
    /// Failures left before a URL starts succeeding
    flaky: Mutex<HashMap<String, u32>>,
    broken: HashSet<String>,
    /// Pages not listed get two generated children each
    generate: bool,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    fn page(mut self, path: &str, links: &[&str]) -> Self {
        self.pages
            .insert(url(path), links.iter().map(|l| url(l)).collect());
        self
    }

    fn flaky(self, path: &str, failures: u32) -> Self {
        self.flaky.lock().insert(url(path), failures);
        self
    }

    fn broken(mut self, path: &str) -> Self {
        self.broken.insert(url(path));
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self, path: &str) -> usize {
        self.calls.lock().get(&url(path)).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        *self.calls.lock().entry(target.to_string()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.contains(target) {
            return Err(FetchError::status(target, 404));
        }
        if let Some(left) = self.flaky.lock().get_mut(target) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::status(target, 503));
            }
        }
        match self.pages.get(target) {
            Some(links) => Ok(links.join("\n")),
            None if self.generate => Ok(format!("{target}/0\n{target}/1")),
            None => Err(FetchError::status(target, 404)),
        }
    }
}

struct LineExtractor;

impl LinkExtractor for LineExtractor {
    fn extract_links(&self, _page_url: &str, body: &str) -> Vec<String> {
        body.lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn config(max_depth: u32, max_retries: u32, workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_retries = max_retries;
    config.crawler.max_workers = workers;
    config.crawler.retry_base_delay_ms = 0;
    config.crawler.retry_max_delay_ms = 0;
    config
}

fn crawler(config: Config, fetcher: &Arc<ScriptedFetcher>, store: Arc<dyn EdgeStore>) -> Crawler {
    Crawler::new(
        Arc::new(config),
        Arc::clone(fetcher) as Arc<dyn Fetcher>,
        Arc::new(LineExtractor),
        store,
    )
}

fn graph(entries: &[(&str, Vec<&str>)]) -> GraphSnapshot {
    entries
        .iter()
        .map(|(page, links)| (url(page), links.iter().map(|l| url(l)).collect()))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_limited_crawl_with_retries() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("a", &["b", "c"])
            .page("b", &["d"])
            .page("c", &[])
            .page("d", &[])
            .flaky("c", 2),
    );
    let store = Arc::new(MemoryEdgeStore::new());
    let crawler = crawler(config(1, 2, 2), &fetcher, store.clone());

    let report = crawler
        .run(&url("a"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.graph,
        graph(&[("a", vec!["b", "c"]), ("b", vec![]), ("c", vec![])])
    );
    assert_eq!(fetcher.calls("a"), 1);
    assert_eq!(fetcher.calls("b"), 1);
    assert_eq!(fetcher.calls("c"), 3);
    assert_eq!(fetcher.calls("d"), 0);

    let summary = &report.summary;
    assert!(!summary.interrupted);
    assert_eq!(summary.visited, 3);
    assert_eq!(summary.retries, 2);
    assert_eq!(summary.permanent_failures, 0);
    assert_eq!(summary.edges_persisted, 2);

    let records = store.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.parent == url("a") && r.occurrences == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_url_fetched_once() {
    // Diamond with a cycle back to the seed.
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("a", &["b", "c"])
            .page("b", &["d", "a"])
            .page("c", &["d"])
            .page("d", &["a"])
            .delay(Duration::from_millis(5)),
    );
    let store = Arc::new(MemoryEdgeStore::new());
    let crawler = crawler(config(5, 0, 8), &fetcher, store.clone());

    let report = crawler
        .run(&url("a"), CancellationToken::new())
        .await
        .unwrap();

    for page in ["a", "b", "c", "d"] {
        assert_eq!(fetcher.calls(page), 1, "{page} fetched more than once");
    }
    assert_eq!(report.graph.len(), 4);
    assert_eq!(report.summary.visited, 4);
    assert!(report.summary.duplicates >= 3);

    // Rediscovered links are still recorded as edges.
    let to_d = store.get(&Edge::new(url("b"), url("d"))).await.unwrap();
    assert!(to_d.is_some());
    let back_to_seed = store.get(&Edge::new(url("d"), url("a"))).await.unwrap();
    assert_eq!(back_to_seed.map(|r| r.occurrences), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_zero_fetches_only_seed() {
    let fetcher = Arc::new(ScriptedFetcher::default().page("a", &["b", "c"]));
    let crawler = crawler(config(0, 0, 4), &fetcher, Arc::new(MemoryEdgeStore::new()));

    let report = crawler
        .run(&url("a"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.graph, graph(&[("a", vec![])]));
    assert_eq!(fetcher.total_calls(), 1);
    assert_eq!(report.summary.edges_persisted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retry_budget_is_bounded() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("a", &["b"])
            .page("b", &[])
            .flaky("b", u32::MAX),
    );
    let crawler = crawler(config(1, 3, 2), &fetcher, Arc::new(MemoryEdgeStore::new()));

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.run(&url("a"), CancellationToken::new()),
    )
    .await
    .expect("crawl should terminate")
    .unwrap();

    assert_eq!(fetcher.calls("b"), 4);
    assert_eq!(report.graph, graph(&[("a", vec!["b"])]));

    let summary = &report.summary;
    assert!(!summary.interrupted);
    assert_eq!(summary.retries, 3);
    assert_eq!(summary.permanent_failures, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].url, url("b"));
    assert_eq!(summary.failures[0].attempts, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_client_errors_use_full_retry_budget() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("a", &["gone"])
            .broken("gone"),
    );
    let crawler = crawler(config(1, 2, 2), &fetcher, Arc::new(MemoryEdgeStore::new()));

    let report = crawler
        .run(&url("a"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetcher.calls("gone"), 3);
    assert_eq!(report.summary.retries, 2);
    assert_eq!(report.summary.permanent_failures, 1);
    assert_eq!(report.summary.failures[0].reason, "HTTP status 404");
    assert_eq!(report.summary.failures[0].attempts, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_concurrency_is_capped() {
    let links: Vec<String> = (0..20).map(|i| format!("p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut fetcher = ScriptedFetcher::default()
        .page("a", &link_refs)
        .delay(Duration::from_millis(20));
    for link in &links {
        fetcher = fetcher.page(link, &[]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(1, 0, 8);
    config.crawler.max_concurrent_fetches = 2;
    let crawler = crawler(config, &fetcher, Arc::new(MemoryEdgeStore::new()));

    let report = crawler
        .run(&url("a"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.visited, 21);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    assert!(report.summary.peak_concurrent_fetches <= 2);
    assert_eq!(report.summary.peak_concurrent_fetches, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interrupt_writes_partial_snapshot() {
    let fetcher = Arc::new(ScriptedFetcher {
        generate: true,
        delay: Duration::from_millis(10),
        ..Default::default()
    });
    let mut config = config(1_000, 0, 4);
    config.crawler.shutdown_grace_secs = 1;
    let crawler = crawler(config, &fetcher, Arc::new(MemoryEdgeStore::new()));

    let tmp = TempDir::new().unwrap();
    let storage = LocalStorage::new(tmp.path());

    let cancel = CancellationToken::new();
    let _stop = interrupt::cancel_on(
        tokio::time::sleep(Duration::from_millis(100)),
        cancel.clone(),
    );

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        crawl_and_persist(&crawler, &storage, &url("a"), cancel),
    )
    .await
    .expect("interrupted crawl should return")
    .unwrap();

    assert!(report.summary.interrupted);
    assert!(!report.graph.is_empty());
    assert!(report.graph.contains_key(&url("a")));
    assert!(report.summary.edges_persisted > 0);

    let on_disk = storage.load_snapshot().await.unwrap().unwrap();
    assert_eq!(on_disk, report.graph);
    let stats = storage.load_summary().await.unwrap().unwrap();
    assert!(stats.interrupted);
}

/// Never answers.
struct HangingFetcher;

#[async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _target: &str) -> Result<String, FetchError> {
        std::future::pending().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stuck_workers_are_aborted_after_grace() {
    let mut config = config(3, 0, 2);
    config.crawler.timeout_secs = 3_600;
    config.crawler.shutdown_grace_secs = 1;
    let crawler = Crawler::new(
        Arc::new(config),
        Arc::new(HangingFetcher),
        Arc::new(LineExtractor),
        Arc::new(MemoryEdgeStore::new()),
    );

    let cancel = CancellationToken::new();
    let _stop = interrupt::cancel_on(
        tokio::time::sleep(Duration::from_millis(50)),
        cancel.clone(),
    );

    let started = std::time::Instant::now();
    let report = tokio::time::timeout(Duration::from_secs(5), crawler.run(&url("a"), cancel))
        .await
        .expect("stuck crawl should be aborted after the grace period")
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(report.summary.interrupted);
    assert!(report.graph.is_empty());
    assert_eq!(report.summary.visited, 0);
    assert_eq!(report.summary.permanent_failures, 0);
}

#[tokio::test]
async fn test_invalid_seed_is_setup_error() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let crawler = crawler(config(1, 0, 1), &fetcher, Arc::new(MemoryEdgeStore::new()));

    let result = crawler.run("not a url", CancellationToken::new()).await;

    assert!(matches!(result, Err(AppError::Setup(_))));
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_invalid_config_is_setup_error() {
    let fetcher = Arc::new(ScriptedFetcher::default().page("a", &[]));
    let crawler = crawler(config(1, 0, 0), &fetcher, Arc::new(MemoryEdgeStore::new()));

    let result = crawler.run(&url("a"), CancellationToken::new()).await;

    assert!(matches!(result, Err(AppError::Setup(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_edge_occurrences_accumulate_across_runs() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("edges.json");

    for _ in 0..2 {
        let fetcher = Arc::new(ScriptedFetcher::default().page("a", &["b"]).page("b", &[]));
        let store = Arc::new(JsonEdgeStore::open(&path).await.unwrap());
        let crawler = crawler(config(1, 0, 2), &fetcher, store);
        crawler
            .run(&url("a"), CancellationToken::new())
            .await
            .unwrap();
    }

    let store = JsonEdgeStore::open(&path).await.unwrap();
    let record = store
        .get(&Edge::new(url("a"), url("b")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.occurrences, 2);
    assert_eq!(store.len().await.unwrap(), 1);
}
