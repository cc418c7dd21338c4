// src/crawl/sink.rs
// =============================================================================
// Collects every link the crawl discovers, together with the page it was
// found on.
//
// How it works:
// 1. Crawl tasks hold a cloned LinkSink and send (url, parent) reports
// 2. One collector task owns the LinkSet and applies reports one at a time
// 3. When every LinkSink is dropped, the channel closes and the collector
//    hands back the finished LinkSet
//
// Because only the collector writes, the output order and the recorded
// parents depend only on the order reports arrive - no locks needed.
//
// The channel is bounded. A full channel makes report() wait; reports are
// never thrown away.
// =============================================================================

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::config::ParentPolicy;

// One edge of the link graph: parent -> url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub parent: String,
}

// Deduplicated, arrival-ordered links plus the url -> parent mapping
#[derive(Debug, Default)]
pub struct LinkSet {
    links: Vec<String>,
    emitted: HashSet<String>,
    parents: HashMap<String, String>,
    policy: ParentPolicy,
}

impl LinkSet {
    pub fn new(policy: ParentPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    // Applies one report. Returns true if the url was new to the output.
    pub fn record(&mut self, link: DiscoveredLink) -> bool {
        let is_new = self.emitted.insert(link.url.clone());
        if is_new {
            self.links.push(link.url.clone());
        }

        match self.policy {
            ParentPolicy::FirstWins => {
                self.parents.entry(link.url).or_insert(link.parent);
            }
            ParentPolicy::LastWins => {
                self.parents.insert(link.url, link.parent);
            }
        }

        is_new
    }

    #[cfg(test)]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    #[cfg(test)]
    pub fn parent_of(&self, url: &str) -> Option<&str> {
        self.parents.get(url).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, HashMap<String, String>) {
        (self.links, self.parents)
    }
}

// Producer handle. Clone one per crawl task.
#[derive(Debug, Clone)]
pub struct LinkSink {
    tx: mpsc::Sender<DiscoveredLink>,
}

// Consumer side; resolves once every LinkSink is gone
#[derive(Debug)]
pub struct SinkCollector {
    handle: JoinHandle<LinkSet>,
}

impl LinkSink {
    // Starts the collector task and returns the first producer handle
    pub fn spawn(capacity: usize, policy: ParentPolicy) -> (LinkSink, SinkCollector) {
        let (tx, mut rx) = mpsc::channel::<DiscoveredLink>(capacity);

        let handle = tokio::spawn(async move {
            let mut set = LinkSet::new(policy);
            while let Some(link) = rx.recv().await {
                set.record(link);
            }
            set
        });

        (LinkSink { tx }, SinkCollector { handle })
    }

    // Waits for room in the channel rather than dropping the report
    pub async fn report(&self, url: String, parent: &str) {
        let link = DiscoveredLink {
            url,
            parent: parent.to_string(),
        };
        if let Err(e) = self.tx.send(link).await {
            // Only possible if the collector task died
            log::error!("link collector is gone, lost report for {}", e.0.url);
        }
    }
}

impl SinkCollector {
    pub async fn finish(self) -> Result<LinkSet, JoinError> {
        self.handle.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, parent: &str) -> DiscoveredLink {
        DiscoveredLink {
            url: url.to_string(),
            parent: parent.to_string(),
        }
    }

    #[test]
    fn test_first_arrival_sets_order() {
        let mut set = LinkSet::new(ParentPolicy::FirstWins);
        assert!(set.record(link("https://b.example", "https://a.example")));
        assert!(set.record(link("https://c.example", "https://a.example")));
        assert!(!set.record(link("https://b.example", "https://c.example")));

        assert_eq!(set.links(), ["https://b.example", "https://c.example"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_first_wins_keeps_first_parent() {
        let mut set = LinkSet::new(ParentPolicy::FirstWins);
        set.record(link("https://d.example", "https://b.example"));
        set.record(link("https://d.example", "https://c.example"));
        assert_eq!(set.parent_of("https://d.example"), Some("https://b.example"));
    }

    #[test]
    fn test_last_wins_overwrites_parent() {
        let mut set = LinkSet::new(ParentPolicy::LastWins);
        set.record(link("https://d.example", "https://b.example"));
        set.record(link("https://d.example", "https://c.example"));
        assert_eq!(set.parent_of("https://d.example"), Some("https://c.example"));
        assert_eq!(set.links(), ["https://d.example"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_tiny_channel_loses_nothing() {
        // Capacity 1 forces producers to wait on each other
        let (sink, collector) = LinkSink::spawn(1, ParentPolicy::FirstWins);

        let producers = (0..8).map(|producer| {
            let sink = sink.clone();
            tokio::spawn(async move {
                let parent = format!("https://parent{}.example", producer);
                for i in 0..50 {
                    sink.report(format!("https://p{}-{}.example", producer, i), &parent)
                        .await;
                }
            })
        });
        for result in futures::future::join_all(producers).await {
            result.unwrap();
        }
        drop(sink);

        let set = collector.finish().await.unwrap();
        assert_eq!(set.len(), 8 * 50);
        assert_eq!(
            set.parent_of("https://p3-7.example"),
            Some("https://parent3.example")
        );
    }

    #[tokio::test]
    async fn test_collector_finishes_empty() {
        let (sink, collector) = LinkSink::spawn(4, ParentPolicy::LastWins);
        drop(sink);
        let set = collector.finish().await.unwrap();
        assert!(set.is_empty());
    }
}
