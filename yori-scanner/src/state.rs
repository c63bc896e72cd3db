use crate::result::Classification;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub requests: usize,
    pub hits: usize,
    pub misses: usize,
    pub soft_404s: usize,
    pub errors: usize,
    pub directories_discovered: usize,
    pub directories_scanned: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct Counters {
    requests: usize,
    hits: usize,
    misses: usize,
    soft_404s: usize,
    errors: usize,
    directories_discovered: usize,
    directories_scanned: usize,
    in_flight: usize,
    peak_in_flight: usize,
    cancelled: bool,
}

/// Counters shared by the workers of a run. Every update republishes a
/// snapshot on a watch channel; readers only ever see the latest one.
#[derive(Debug)]
pub struct RunState {
    counters: Mutex<Counters>,
    started: Instant,
    progress: watch::Sender<RunSnapshot>,
}

impl RunState {
    pub fn new() -> Self {
        let (progress, _rx) = watch::channel(RunSnapshot::default());
        Self {
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.progress.subscribe()
    }

    /// A request outside the candidate stream (calibration).
    pub fn record_request(&self) {
        self.update(|c| c.requests += 1);
    }

    pub fn probe_started(&self) {
        self.update(|c| {
            c.requests += 1;
            c.in_flight += 1;
            c.peak_in_flight = c.peak_in_flight.max(c.in_flight);
        });
    }

    pub fn probe_finished(&self, classification: Classification) {
        self.update(|c| {
            c.in_flight = c.in_flight.saturating_sub(1);
            match classification {
                Classification::Hit => c.hits += 1,
                Classification::Miss => c.misses += 1,
                Classification::SoftFour04 => c.soft_404s += 1,
                Classification::Error => c.errors += 1,
            }
        });
    }

    pub fn record_directory_discovered(&self) {
        self.update(|c| c.directories_discovered += 1);
    }

    pub fn record_directory_scanned(&self) {
        self.update(|c| c.directories_scanned += 1);
    }

    pub fn mark_cancelled(&self) {
        self.update(|c| c.cancelled = true);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        self.snapshot_of(&counters)
    }

    fn update(&self, apply: impl FnOnce(&mut Counters)) {
        let snapshot = {
            let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut counters);
            self.snapshot_of(&counters)
        };
        self.progress.send_replace(snapshot);
    }

    fn snapshot_of(&self, counters: &Counters) -> RunSnapshot {
        RunSnapshot {
            requests: counters.requests,
            hits: counters.hits,
            misses: counters.misses,
            soft_404s: counters.soft_404s,
            errors: counters.errors,
            directories_discovered: counters.directories_discovered,
            directories_scanned: counters.directories_scanned,
            in_flight: counters.in_flight,
            peak_in_flight: counters.peak_in_flight,
            elapsed: self.started.elapsed(),
            cancelled: counters.cancelled,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
