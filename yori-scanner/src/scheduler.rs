use crate::cancel::CancelSignal;
use crate::classifier::Classifier;
use crate::error::{NetworkError, Result, ScanError};
use crate::generator::Candidate;
use crate::limiter::RateLimiter;
use crate::prober::{ProbeOutcome, Prober};
use crate::recursion::directory_url;
use crate::result::ProbeResult;
use crate::state::RunState;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// How long in-flight probes may keep running once cancellation is observed.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);

type CandidateQueue = Arc<Mutex<Box<dyn Iterator<Item = Candidate> + Send>>>;

/// Fixed pool of workers draining one candidate queue.
#[derive(Clone)]
pub struct Scheduler {
    prober: Prober,
    concurrency: usize,
    limiter: Option<Arc<RateLimiter>>,
    state: Arc<RunState>,
    cancel: CancelSignal,
    grace: Duration,
}

impl Scheduler {
    pub fn new(
        prober: Prober,
        concurrency: usize,
        state: Arc<RunState>,
        cancel: CancelSignal,
    ) -> Result<Self> {
        if concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            prober,
            concurrency,
            limiter: None,
            state,
            cancel,
            grace: DEFAULT_CANCEL_GRACE,
        })
    }

    /// Cap the request rate of every worker combined.
    pub fn with_rate_limit(mut self, requests_per_second: Option<u32>) -> Self {
        self.limiter = requests_per_second.map(|rate| Arc::new(RateLimiter::per_second(rate)));
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Probe candidates until the sequence is exhausted or the run is
    /// cancelled. Every candidate taken off the queue and sent to the server
    /// produces exactly one result on `results`. Returns how many were sent.
    pub async fn run<I>(
        &self,
        candidates: I,
        classifier: Arc<Classifier>,
        results: mpsc::Sender<ProbeResult>,
    ) -> Result<usize>
    where
        I: Iterator<Item = Candidate> + Send + 'static,
    {
        let queue: CandidateQueue = Arc::new(Mutex::new(Box::new(candidates)));

        let mut worker_handles = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            let worker = self.clone();
            let queue = queue.clone();
            let classifier = classifier.clone();
            let results = results.clone();

            worker_handles.push(tokio::spawn(async move {
                worker.work(worker_id, queue, classifier, results).await
            }));
        }
        drop(results);

        let mut sent = 0;
        for handle in join_all(worker_handles).await {
            sent += handle?;
        }
        Ok(sent)
    }

    async fn work(
        &self,
        worker_id: usize,
        queue: CandidateQueue,
        classifier: Arc<Classifier>,
        results: mpsc::Sender<ProbeResult>,
    ) -> usize {
        debug!("Worker {} started", worker_id);
        let mut sent = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {} observed cancellation", worker_id);
                break;
            }

            // Wait for a slot before dequeuing: once taken off the queue, a
            // candidate must produce a result.
            if let Some(ref limiter) = self.limiter {
                tokio::select! {
                    _ = limiter.acquire() => {}
                    _ = self.cancel.cancelled() => break,
                }
            }

            let next = {
                let mut queue = queue.lock().await;
                queue.next()
            };
            let Some(candidate) = next else {
                break;
            };

            let result = self.probe(candidate, &classifier).await;
            if results.send(result).await.is_err() {
                debug!("Worker {}: result receiver dropped", worker_id);
                break;
            }
            sent += 1;
        }

        debug!("Worker {} finished after {} probes", worker_id, sent);
        sent
    }

    async fn probe(&self, candidate: Candidate, classifier: &Classifier) -> ProbeResult {
        self.state.probe_started();
        let start = Instant::now();

        let outcome = tokio::select! {
            outcome = self.prober.probe(candidate.url()) => outcome,
            _ = self.abort_after_grace() => ProbeOutcome::Failed {
                error: NetworkError::cancelled(),
                elapsed: start.elapsed(),
            },
        };

        let classification = classifier.classify(&outcome);
        let directory = match &outcome {
            ProbeOutcome::Response(response) => directory_url(&candidate, response),
            ProbeOutcome::Failed { .. } => None,
        };
        self.state.probe_finished(classification);

        ProbeResult::from_outcome(candidate, outcome, classification, directory)
    }

    async fn abort_after_grace(&self) {
        self.cancel.cancelled().await;
        tokio::time::sleep(self.grace).await;
    }
}
