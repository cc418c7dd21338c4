// src/crawl/mod.rs
// =============================================================================
// This module is the crawl engine.
//
// Features:
// - Depth-bounded crawling starting from a seed URL
// - A fixed number of pages fetched at the same time
// - Every URL fetched at most once per crawl
// - Every discovered link recorded once, with the page it was found on
//
// Submodules (leaf first):
// - fetcher: downloads one page
// - extract: finds absolute http(s) links in a page
// - visited: remembers which URLs were claimed
// - limiter: the pool of concurrency tokens
// - sink: collects links and their parents
// - traversal: ties it all together
// =============================================================================

mod config;
mod error;
mod extract;
mod fetcher;
mod limiter;
mod sink;
mod traversal;
mod visited;

// Re-export the pieces the front ends need
pub use config::{AdmissionPolicy, CrawlConfig, ParentPolicy};
pub use error::{CrawlError, PageError};
pub use fetcher::{Fetch, HttpFetcher};
pub use traversal::{CrawlReport, CrawlStats, Crawler};
