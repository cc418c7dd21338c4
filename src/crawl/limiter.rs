// src/crawl/limiter.rs
// =============================================================================
// A fixed pool of concurrency tokens.
//
// Whoever holds a token may fetch and parse one page. Tokens are RAII
// permits from a tokio Semaphore: dropping one returns it to the pool, so
// a token is given back even when the fetch fails or the task panics.
// =============================================================================

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

// Proof that the holder may run one fetch+extract cycle
pub type ConcurrencyToken = OwnedSemaphorePermit;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    // Waits until a token is free.
    // Returns None only if the pool was closed, which this crate never does.
    pub async fn acquire(&self) -> Option<ConcurrencyToken> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }

    // Takes a token only if one is free right now
    pub fn try_acquire(&self) -> Option<ConcurrencyToken> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_try_acquire_stops_at_capacity() {
        let limiter = ConcurrencyLimiter::new(2);
        let first = limiter.try_acquire();
        let second = limiter.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn test_dropping_token_releases_it() {
        let limiter = ConcurrencyLimiter::new(1);
        let token = limiter.try_acquire();
        assert_eq!(limiter.available(), 0);
        drop(token);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }
}
