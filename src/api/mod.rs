// src/api/mod.rs
// =============================================================================
// This module exposes the crawler over HTTP.
//
// Endpoints:
// - POST /api/crawl  {"url": "...", "depth": 2, "concurrency": 10}
// - GET  /health
//
// Each request runs its own crawl with fresh visited/link state; only the
// HTTP client is shared between requests.
// =============================================================================

mod routes;

pub use routes::{serve, ApiState};
