// src/crawl/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Two families:
// - PageError: something went wrong with ONE page (bad URL, network trouble,
//   non-200 status, undecodable body). These never stop the crawl - the
//   page is skipped and the failure is logged.
// - ConfigError / CrawlError: the crawl could not start (or could not
//   finish collecting results). These are the only errors a caller sees.
//
// Rust concepts:
// - thiserror: derive macro that writes the Display and Error impls for us
// - Enums with data: each variant carries the details of what failed
// =============================================================================

use thiserror::Error;

// Why a network request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Request timed out
    Timeout,
    /// Could not resolve hostname
    Dns,
    /// Connection refused or reset
    Connect,
    /// SSL/TLS certificate error
    Tls,
    /// Too many redirects (redirect loop)
    Redirect,
    /// Anything else reqwest reports
    Other,
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FetchFailure::Timeout => "timeout",
            FetchFailure::Dns => "dns error",
            FetchFailure::Connect => "connection failed",
            FetchFailure::Tls => "ssl error",
            FetchFailure::Redirect => "too many redirects",
            FetchFailure::Other => "error",
        };
        f.write_str(label)
    }
}

// A per-page failure. The page resolves with zero children.
#[derive(Debug, Error)]
pub enum PageError {
    /// The request could not even be built (e.g. the URL does not parse)
    #[error("request error for {url}: {message}")]
    RequestConstruction { url: String, message: String },

    /// Network-level failure while sending the request or reading the body
    #[error("fetch error for {url} ({kind}): {message}")]
    Fetch {
        url: String,
        kind: FetchFailure,
        message: String,
    },

    /// The server answered with something other than 200 OK
    #[error("bad status for {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The body could not be turned into a document
    #[error("parse error for {url}: {message}")]
    Parse { url: String, message: String },
}

// Rejected crawl parameters, reported before any traversal starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("seed URL must not be empty")]
    EmptySeed,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("concurrency {0} is above the supported maximum")]
    ConcurrencyTooHigh(usize),

    #[error("{0} capacity must be at least 1")]
    ZeroCapacity(&'static str),

    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,
}

// Everything crawl() can hand back to its caller
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid crawl parameters: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("link collector stopped unexpectedly: {0}")]
    Collector(#[from] tokio::task::JoinError),
}
