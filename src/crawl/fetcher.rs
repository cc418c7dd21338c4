// src/crawl/fetcher.rs
// =============================================================================
// This module downloads pages.
//
// Key functionality:
// - One HTTP GET per call, bounded by a fixed timeout
// - Only HTTP 200 counts as success; everything else is a PageError
// - Network failures are sorted into timeout / DNS / connect / SSL buckets
//
// The crawl engine talks to the network only through the `Fetch` trait, so
// tests can swap in an in-memory web.
//
// Rust concepts:
// - Traits: an interface the crawler depends on instead of a concrete type
// - async-trait: lets us store the fetcher as Arc<dyn Fetch>
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::error::{FetchFailure, PageError};

// Anything that can turn a URL into page bytes
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PageError>;
}

// The real fetcher, backed by a shared reqwest client
//
// Client is cheap to clone (it's an Arc internally) and pools connections,
// so one HttpFetcher is shared by every crawl task.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link-tracer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PageError> {
        // Building first separates "this URL is garbage" from network trouble
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| PageError::RequestConstruction {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PageError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| categorize_error(url, e))?;

        Ok(body.to_vec())
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(url: &str, error: reqwest::Error) -> PageError {
    let message = error.to_string();
    let lowered = message.to_lowercase();

    let kind = if error.is_timeout() {
        FetchFailure::Timeout
    } else if error.is_redirect() {
        FetchFailure::Redirect
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if lowered.contains("dns") {
            FetchFailure::Dns
        } else {
            FetchFailure::Connect
        }
    } else if lowered.contains("certificate") || lowered.contains("ssl") {
        FetchFailure::Tls
    } else {
        FetchFailure::Other
    };

    PageError::Fetch {
        url: url.to_string(),
        kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_ok_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<a href=\"https://rust-lang.org\">Rust</a>")
            .create_async()
            .await;

        let url = format!("{}/page", server.url());
        let body = fetcher().fetch(&url).await.unwrap();

        assert_eq!(body, b"<a href=\"https://rust-lang.org\">Rust</a>".to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;

        let url = format!("{}/broken", server.url());
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, PageError::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_non_200_success_is_still_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/created")
            .with_status(201)
            .with_body("<a href=\"https://example.com\">x</a>")
            .create_async()
            .await;

        let url = format!("{}/created", server.url());
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, PageError::HttpStatus { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_unparsable_url_is_construction_error() {
        let err = fetcher().fetch("not a url at all").await.unwrap_err();
        match err {
            PageError::RequestConstruction { url, .. } => assert_eq!(url, "not a url at all"),
            other => panic!("expected a construction error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_fetch_error() {
        // Port 1 is reserved and nothing listens there
        let err = fetcher().fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, PageError::Fetch { .. }));
    }
}
