// src/api/routes.rs
// =============================================================================
// axum router, handlers and the server loop.
//
// Errors come back as JSON too: {"error": "Invalid input"}
//
// Every route allows cross-origin calls (Access-Control-Allow-Origin: *),
// and OPTIONS preflights get a 200, so a browser page on another origin
// can use the API.
// =============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::crawl::{CrawlConfig, CrawlError, CrawlReport, Crawler, Fetch};

// Shared by every request
#[derive(Clone)]
pub struct ApiState {
    fetcher: Arc<dyn Fetch>,
    // Timeout, policies and capacities; depth and concurrency come per request
    defaults: CrawlConfig,
    started_at: Instant,
}

impl ApiState {
    pub fn new(fetcher: Arc<dyn Fetch>, defaults: CrawlConfig) -> Self {
        Self {
            fetcher,
            defaults,
            started_at: Instant::now(),
        }
    }
}

// Signed on purpose: a negative depth is our 400, not a serde 422
#[derive(Debug, Deserialize)]
struct CrawlRequest {
    url: String,
    depth: i64,
    concurrency: i64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn router(state: ApiState) -> Router {
    // Answers OPTIONS itself, before the request reaches a route
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // A wrong method gets a JSON body instead of an empty 405
        .route("/api/crawl", post(crawl_handler).fallback(method_not_allowed))
        .route("/health", get(health_handler).fallback(method_not_allowed))
        .layer(cors)
        .with_state(state)
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn crawl_handler(
    State(state): State<ApiState>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<CrawlReport>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        log::debug!("Rejected crawl request body: {}", e);
        ApiError::bad_request("Invalid JSON")
    })?;

    let (max_depth, concurrency) = match (
        usize::try_from(request.depth),
        usize::try_from(request.concurrency),
    ) {
        (Ok(depth), Ok(concurrency)) if concurrency >= 1 && !request.url.trim().is_empty() => {
            (depth, concurrency)
        }
        _ => return Err(ApiError::bad_request("Invalid input")),
    };

    let config = CrawlConfig {
        max_depth,
        concurrency,
        ..state.defaults.clone()
    };

    let report = Crawler::new(Arc::clone(&state.fetcher), config)
        .crawl(&request.url)
        .await
        .map_err(|e| match e {
            // Out-of-range values (e.g. concurrency above the maximum) are
            // just more invalid input to the caller
            CrawlError::InvalidConfig(e) => {
                log::debug!("Rejected crawl request: {}", e);
                ApiError::bad_request("Invalid input")
            }
            other => {
                log::error!("Crawl of {} failed: {}", request.url, other);
                ApiError::internal("Internal server error")
            }
        })?;

    Ok(Json(report))
}

async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: format!("{:.0?}", state.started_at.elapsed()),
    })
}

// Binds `addr` and serves until the process is stopped
pub async fn serve(addr: SocketAddr, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    log::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state).into_make_service())
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::PageError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt; // for oneshot()

    struct StaticWeb {
        pages: HashMap<&'static str, &'static str>,
    }

    #[async_trait]
    impl Fetch for StaticWeb {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, PageError> {
            match self.pages.get(url) {
                Some(html) => Ok(html.as_bytes().to_vec()),
                None => Err(PageError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn app() -> Router {
        let mut pages = HashMap::new();
        pages.insert(
            "https://seed.example",
            r#"<a href="https://one.example">1</a><a href="/relative">r</a>"#,
        );
        pages.insert("https://one.example", r#"<a href="https://two.example">2</a>"#);

        let state = ApiState::new(Arc::new(StaticWeb { pages }), CrawlConfig::default());
        router(state)
    }

    async fn post_crawl(body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/crawl")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_crawl_returns_links_and_parents() {
        let (status, json) =
            post_crawl(r#"{"url":"https://seed.example","depth":2,"concurrency":2}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["links"],
            serde_json::json!(["https://one.example", "https://two.example"])
        );
        assert_eq!(json["parent_urls"]["https://two.example"], "https://one.example");
        assert!(json["duration_seconds"].is_number());
    }

    #[tokio::test]
    async fn test_extra_fields_are_ignored() {
        let (status, _) = post_crawl(
            r#"{"url":"https://seed.example","depth":1,"concurrency":1,"output":"console"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (status, json) = post_crawl("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid JSON");
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        for body in [
            r#"{"url":"","depth":1,"concurrency":1}"#,
            r#"{"url":"https://seed.example","depth":-1,"concurrency":1}"#,
            r#"{"url":"https://seed.example","depth":1,"concurrency":0}"#,
            r#"{"url":"https://seed.example","depth":1,"concurrency":5000}"#,
        ] {
            let (status, json) = post_crawl(body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(json["error"], "Invalid input");
        }
    }

    #[tokio::test]
    async fn test_health_reports_healthy() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_get_on_crawl_is_not_allowed() {
        let request = Request::builder()
            .uri("/api/crawl")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_post_on_health_is_not_allowed() {
        let request = Request::builder()
            .method("POST")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_preflight_allows_any_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/crawl")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"), "allowed methods: {}", methods);
        assert!(methods.contains("OPTIONS"), "allowed methods: {}", methods);
    }

    #[tokio::test]
    async fn test_crawl_response_carries_cors_header() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/crawl")
            .header("origin", "http://localhost:3000")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"url":"https://seed.example","depth":1,"concurrency":1}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
