// src/crawl/visited.rs
// =============================================================================
// Tracks which URLs have already been claimed for fetching.
//
// A claim is a single atomic insert into a sharded concurrent set
// (dashmap). Exactly one caller gets `true` for a given URL; everyone else
// gets `false` and must skip it. URLs are never removed during a crawl.
// =============================================================================

use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns true if this call won the right to fetch `url`
    pub fn claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}
