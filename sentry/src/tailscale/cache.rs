//! TTL cache for status snapshots.
//!
//! One tailnet per process, so the cache is a single slot. The slot mutex is
//! held across a refresh, which collapses concurrent cold readers onto one
//! subprocess invocation; everyone queued behind the refresh sees its result.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::SentryError;
use crate::tailscale::status::DeviceStatus;

/// Monotonic time source, injected so tests can drive TTL expiry by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One cached snapshot and when it was fetched. Replaced wholesale, never
/// partially updated.
struct CacheEntry {
    status: Arc<DeviceStatus>,
    fetched_at: Instant,
}

/// Single-slot TTL cache over `tailscale status --json` snapshots.
pub struct StatusCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CacheEntry>>,
}

impl StatusCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached snapshot when fresh, otherwise run `fetch` and cache
    /// its result. A `force_live` read discards any cached entry first.
    ///
    /// Fetch errors are returned to every waiting caller and never cached.
    pub async fn get_with<F, Fut>(
        &self,
        force_live: bool,
        fetch: F,
    ) -> Result<Arc<DeviceStatus>, SentryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DeviceStatus, SentryError>>,
    {
        let mut slot = self.slot.lock().await;

        if force_live {
            *slot = None;
        }

        if let Some(entry) = slot.as_ref() {
            if self.clock.now().duration_since(entry.fetched_at) < self.ttl {
                return Ok(entry.status.clone());
            }
        }

        debug!(force_live, "Status cache miss, refreshing");
        let status = Arc::new(fetch().await?);
        *slot = Some(CacheEntry {
            status: status.clone(),
            fetched_at: self.clock.now(),
        });

        Ok(status)
    }

    /// The last cached snapshot regardless of freshness. Used where a stale
    /// view is better than none, never as a substitute for `get_with`.
    pub async fn peek(&self) -> Option<Arc<DeviceStatus>> {
        self.slot.lock().await.as_ref().map(|e| e.status.clone())
    }

    /// Drop the cached entry so the next read reflects live state.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Clock advanced manually by tests.
    struct FakeClock {
        start: Instant,
        offset: std::sync::Mutex<Duration>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: std::sync::Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + *self.offset.lock().unwrap()
        }
    }

    fn sample_status() -> DeviceStatus {
        DeviceStatus::parse(r#"{"Self":{"HostName":"h1"},"Peer":{}}"#).unwrap()
    }

    #[tokio::test]
    async fn test_ttl_window_serves_cached_value() {
        let clock = Arc::new(FakeClock::new());
        let cache = StatusCache::new(Duration::from_secs(5), clock.clone());
        let fetches = AtomicUsize::new(0);

        for _ in 0..10 {
            cache
                .get_with(false, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_status())
                })
                .await
                .unwrap();
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(6));
        cache
            .get_with(false, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(sample_status())
            })
            .await
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_live_bypasses_cache() {
        let cache = StatusCache::new(Duration::from_secs(5), Arc::new(SystemClock));
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_with(true, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_status())
                })
                .await
                .unwrap();
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = StatusCache::new(Duration::from_secs(5), Arc::new(SystemClock));

        let err = cache
            .get_with(false, || async {
                Err(SentryError::ParseError("bad".to_string()))
            })
            .await;
        assert!(err.is_err());

        // Next call fetches again and succeeds.
        let ok = cache.get_with(false, || async { Ok(sample_status()) }).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_peek_returns_expired_entry() {
        let clock = Arc::new(FakeClock::new());
        let cache = StatusCache::new(Duration::from_secs(5), clock.clone());

        assert!(cache.peek().await.is_none());
        cache
            .get_with(false, || async { Ok(sample_status()) })
            .await
            .unwrap();

        clock.advance(Duration::from_secs(60));
        let stale = cache.peek().await.unwrap();
        assert_eq!(stale.self_node.host_name, "h1");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = StatusCache::new(Duration::from_secs(60), Arc::new(SystemClock));
        let fetches = AtomicUsize::new(0);

        cache
            .get_with(false, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(sample_status())
            })
            .await
            .unwrap();
        cache.invalidate().await;
        cache
            .get_with(false, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(sample_status())
            })
            .await
            .unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
