use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

type HostSlot = Arc<Mutex<Option<Instant>>>;

/// Enforces a minimum gap between two requests to the same host.
///
/// Each host gets its own lock, so callers targeting different hosts never wait on
/// each other, while two callers for one host serialize through wait-then-stamp.
/// Entries live for the lifetime of the limiter.
pub struct HostRateLimiter {
    delay: Duration,
    hosts: DashMap<String, HostSlot>,
}

impl HostRateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hosts: DashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until `delay` has passed since the last request to `host`, then record
    /// and return the new request timestamp.
    pub async fn throttle(&self, host: &str) -> Instant {
        let slot = self.slot(host);
        let mut last = slot.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.delay;
            if ready_at > Instant::now() {
                trace!("Throttling {} for {:?}", host, ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let stamp = Instant::now();
        *last = Some(stamp);
        stamp
    }

    /// Number of hosts seen so far.
    pub fn tracked_hosts(&self) -> usize {
        self.hosts.len()
    }

    fn slot(&self, host: &str) -> HostSlot {
        // Clone the Arc out so the shard lock is released before awaiting.
        self.hosts
            .entry(host.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }
}

impl Default for HostRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
