// src/crawl/traversal.rs
// =============================================================================
// This module drives the crawl.
//
// How it works:
// 1. The dispatcher (the crawl() loop) takes pages off the frontier queue
// 2. A page with no depth left is skipped; so is a page someone already
//    claimed in the VisitedSet
// 3. Otherwise the dispatcher waits for a concurrency token and spawns a
//    task into a JoinSet
// 4. The task fetches and parses the page, gives its token back, reports
//    every link to the sink, then queues the links as children at depth-1
// 5. The crawl is over when nothing is running and the queue is empty
//
// Per-page failures (bad URL, timeout, HTTP 500, binary body) are logged
// and the page simply has no children. They never stop the crawl.
//
// Rust concepts:
// - JoinSet: owns a group of spawned tasks and yields them as they finish
// - mpsc channel: the bounded frontier queue between tasks and dispatcher
// - Arc: shares the per-crawl state between tasks
// =============================================================================

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::config::{validate_seed, AdmissionPolicy, CrawlConfig};
use super::error::{CrawlError, PageError};
use super::extract::page_links;
use super::fetcher::{Fetch, HttpFetcher};
use super::limiter::{ConcurrencyLimiter, ConcurrencyToken};
use super::sink::LinkSink;
use super::visited::VisitedSet;

// Represents a page in the crawl queue
#[derive(Debug)]
struct CrawlItem {
    url: String,
    depth: usize, // How many more levels we may go from here
    // Pre-acquired token, only set under AdmissionPolicy::DropWhenSaturated
    token: Option<ConcurrencyToken>,
}

impl CrawlItem {
    fn seed(url: &str, depth: usize) -> Self {
        Self {
            url: url.to_string(),
            depth,
            token: None,
        }
    }

    fn child(&self, url: String) -> Self {
        Self {
            url,
            depth: self.depth.saturating_sub(1),
            token: None,
        }
    }

    fn with_token(mut self, token: ConcurrencyToken) -> Self {
        self.token = Some(token);
        self
    }

    fn is_exhausted(&self) -> bool {
        self.depth == 0
    }
}

// What happened during a crawl, for summaries and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub duplicates_skipped: usize,
    pub depth_exhausted: usize,
    pub children_dropped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
    exhausted: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            pages_fetched: self.fetched.load(Ordering::Relaxed),
            pages_failed: self.failed.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates.load(Ordering::Relaxed),
            depth_exhausted: self.exhausted.load(Ordering::Relaxed),
            children_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

// The result of one crawl
//
// Serializes to the JSON shape the HTTP API and `--output json` return.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    /// Unique links in the order they were first reported
    pub links: Vec<String>,
    /// url -> the page it was found on
    #[serde(rename = "parent_urls")]
    pub parents: BTreeMap<String, String>,
    pub duration_seconds: f64,
    pub stats: CrawlStats,
}

impl CrawlReport {
    pub fn parent_of(&self, url: &str) -> Option<&str> {
        self.parents.get(url).map(String::as_str)
    }
}

// State shared by every task of ONE crawl; dropped when the crawl ends
struct CrawlContext {
    fetcher: Arc<dyn Fetch>,
    visited: VisitedSet,
    limiter: ConcurrencyLimiter,
    admission: AdmissionPolicy,
    counters: Counters,
}

pub struct Crawler {
    fetcher: Arc<dyn Fetch>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetch>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    // Crawler backed by a real HTTP client using the config's timeout
    pub fn with_http(config: CrawlConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    // Crawls everything reachable from `seed` within max_depth hops
    //
    // Only bad parameters produce an error. A seed that fails to load
    // gives an empty report.
    pub async fn crawl(&self, seed: &str) -> Result<CrawlReport, CrawlError> {
        // Reject bad parameters before touching the network
        validate_seed(seed)?;
        self.config.validate()?;

        let started = Instant::now();
        log::info!(
            "Crawling {} (depth={}, concurrency={}, admission={:?})",
            seed,
            self.config.max_depth,
            self.config.concurrency,
            self.config.admission
        );

        // Fresh state for every crawl; nothing carries over between runs
        let context = Arc::new(CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            visited: VisitedSet::new(),
            limiter: ConcurrencyLimiter::new(self.config.concurrency),
            admission: self.config.admission,
            counters: Counters::default(),
        });

        // Collector for (url, parent) reports, and the queue of pages to admit
        let (sink, collector) =
            LinkSink::spawn(self.config.sink_capacity, self.config.parent_policy);
        let (frontier_tx, mut frontier_rx) =
            mpsc::channel::<CrawlItem>(self.config.queue_capacity);
        let mut running = JoinSet::new();

        // The seed goes straight to admission, like any other page
        let seed_item = CrawlItem::seed(seed, self.config.max_depth);
        admit(&context, seed_item, &mut running, &frontier_tx, &sink).await;

        loop {
            // Every child is queued before its parent task finishes, so an
            // empty JoinSet plus an empty queue means we are done.
            if running.is_empty() {
                match frontier_rx.try_recv() {
                    Ok(item) => {
                        admit(&context, item, &mut running, &frontier_tx, &sink).await;
                        continue;
                    }
                    Err(_) => break,
                }
            }

            // Admit new pages and reap finished tasks, whichever comes first
            tokio::select! {
                Some(item) = frontier_rx.recv() => {
                    admit(&context, item, &mut running, &frontier_tx, &sink).await;
                }
                Some(finished) = running.join_next() => {
                    if let Err(e) = finished {
                        log::error!("Crawl task ended abnormally: {}", e);
                    }
                }
            }
        }

        // Last producer handles; the collector finishes once tasks' clones are gone too
        drop(frontier_tx);
        drop(sink);
        let link_set = collector.finish().await?;

        // BTreeMap keeps parent_urls sorted in the JSON output
        let (links, parents) = link_set.into_parts();
        let report = CrawlReport {
            seed: seed.to_string(),
            links,
            parents: parents.into_iter().collect(),
            duration_seconds: started.elapsed().as_secs_f64(),
            stats: context.counters.snapshot(),
        };

        log::info!(
            "Finished {}: {} unique links, {} pages claimed, {} fetched, {} failed, {} dropped in {:.2}s",
            seed,
            report.links.len(),
            context.visited.len(),
            report.stats.pages_fetched,
            report.stats.pages_failed,
            report.stats.children_dropped,
            report.duration_seconds
        );

        Ok(report)
    }
}

// Decides whether a queued page runs, and spawns it if so
async fn admit(
    context: &Arc<CrawlContext>,
    mut item: CrawlItem,
    running: &mut JoinSet<()>,
    frontier: &mpsc::Sender<CrawlItem>,
    sink: &LinkSink,
) {
    // Depth is checked first, so an exhausted page never takes a claim
    if item.is_exhausted() {
        Counters::bump(&context.counters.exhausted);
        log::debug!("Depth exhausted, not fetching {}", item.url);
        return;
    }

    // Exactly one caller wins the claim; everyone else skips the page
    if !context.visited.claim(&item.url) {
        Counters::bump(&context.counters.duplicates);
        log::debug!("Already claimed: {}", item.url);
        return;
    }

    // Under DropWhenSaturated the parent already took a token for us.
    // Under Block we wait here until one frees up.
    let token = match item.token.take() {
        Some(token) => token,
        None => match context.limiter.acquire().await {
            Some(token) => token,
            None => {
                log::error!("Concurrency limiter closed, skipping {}", item.url);
                return;
            }
        },
    };

    // Each task gets its own handles to the frontier and the sink
    running.spawn(visit(
        Arc::clone(context),
        item,
        token,
        frontier.clone(),
        sink.clone(),
    ));
}

// Fetches one page, reports its links and queues its children
async fn visit(
    context: Arc<CrawlContext>,
    item: CrawlItem,
    token: ConcurrencyToken,
    frontier: mpsc::Sender<CrawlItem>,
    sink: LinkSink,
) {
    log::debug!("Crawling [depth {}]: {}", item.depth, item.url);

    // Fetch the page and pull out its links
    let links = match fetch_and_extract(context.fetcher.as_ref(), &item.url).await {
        Ok(links) => links,
        Err(e) => {
            // A failed page has no children; the token drops with us
            Counters::bump(&context.counters.failed);
            log::warn!("Skipping {}", e);
            return;
        }
    };

    // Token covers fetch+extract only, never the children
    drop(token);
    Counters::bump(&context.counters.fetched);

    // All of this page's reports go out before any child can run, so a
    // child's own reports always arrive after its parent's.
    for link in &links {
        sink.report(link.clone(), &item.url).await;
    }

    // Links repeated on this page are queued once
    let mut queued = HashSet::new();
    for link in links {
        // Cheap pre-check; the real claim happens in admit()
        if context.visited.contains(&link) || !queued.insert(link.clone()) {
            continue;
        }

        // No depth left: reported above, but never fetched
        let child = item.child(link);
        if child.is_exhausted() {
            Counters::bump(&context.counters.exhausted);
            continue;
        }

        let child = match context.admission {
            AdmissionPolicy::Block => child,
            AdmissionPolicy::DropWhenSaturated => match context.limiter.try_acquire() {
                Some(token) => child.with_token(token),
                None => {
                    Counters::bump(&context.counters.dropped);
                    log::debug!("Limiter saturated, dropping {}", child.url);
                    continue;
                }
            },
        };

        // Waits while the frontier is full
        if frontier.send(child).await.is_err() {
            log::error!("Frontier closed while crawling {}", item.url);
            return;
        }
    }
}

async fn fetch_and_extract(fetcher: &dyn Fetch, url: &str) -> Result<Vec<String>, PageError> {
    let body = fetcher.fetch(url).await?;
    page_links(url, &body)
}
