use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Leaky-bucket pacing shared by every worker. Each caller reserves the next
/// free slot under a FIFO lock, so no worker is starved and at most one
/// request goes out per interval.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_second` must be non-zero.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = requests_per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / rate,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for a request slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
