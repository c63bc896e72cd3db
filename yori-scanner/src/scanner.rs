use crate::cancel::CancelSignal;
use crate::classifier::{Classifier, InterestingStatus, calibrate};
use crate::error::{Result, ScanError};
use crate::generator::{CandidateSources, Generator};
use crate::prober::{DEFAULT_USER_AGENT, ProbeMethod, Prober, ProberOptions};
use crate::recursion::{
    DEFAULT_DIRECTORY_WARN_THRESHOLD, DEFAULT_MAX_DEPTH, Offer, RecursionController, Scope,
};
use crate::result::{ScanEvent, ScanReport, ScanWarning};
use crate::scheduler::{DEFAULT_CANCEL_GRACE, Scheduler};
use crate::state::{RunSnapshot, RunState};
use crate::target::Target;
use crate::wordlist::{DirectorySet, ExtensionSet, Wordlist};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const MAX_CONCURRENCY: usize = 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a run needs. Build with `ScanConfig::new` and the `with_*`
/// setters.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: String,
    pub wordlist: Wordlist,
    pub extensions: ExtensionSet,
    pub directories: DirectorySet,
    /// Skip merging the built-in extensions and directories.
    pub no_common: bool,
    pub directory_extensions: bool,
    pub concurrency: usize,
    /// Requests per second across all workers; `None` is unlimited.
    pub rate_limit: Option<u32>,
    pub timeout: Duration,
    /// Global time budget; the run is cancelled when it runs out.
    pub max_time: Option<Duration>,
    pub cancel_grace: Duration,
    pub method: ProbeMethod,
    pub recursive: bool,
    pub max_depth: usize,
    pub directory_warn_threshold: usize,
    pub interesting: InterestingStatus,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            wordlist: Wordlist::empty(),
            extensions: ExtensionSet::default(),
            directories: DirectorySet::default(),
            no_common: false,
            directory_extensions: false,
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: None,
            timeout: DEFAULT_TIMEOUT,
            max_time: None,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            method: ProbeMethod::Get,
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            directory_warn_threshold: DEFAULT_DIRECTORY_WARN_THRESHOLD,
            interesting: InterestingStatus::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_wordlist(mut self, wordlist: Wordlist) -> Self {
        self.wordlist = wordlist;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_directories(mut self, directories: DirectorySet) -> Self {
        self.directories = directories;
        self
    }

    pub fn with_no_common(mut self, no_common: bool) -> Self {
        self.no_common = no_common;
        self
    }

    pub fn with_directory_extensions(mut self, enabled: bool) -> Self {
        self.directory_extensions = enabled;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: Option<u32>) -> Self {
        self.rate_limit = requests_per_second;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_recursion(mut self, recursive: bool, max_depth: usize) -> Self {
        self.recursive = recursive;
        self.max_depth = max_depth;
        self
    }

    pub fn with_directory_warn_threshold(mut self, threshold: usize) -> Self {
        self.directory_warn_threshold = threshold;
        self
    }

    pub fn with_interesting(mut self, interesting: InterestingStatus) -> Self {
        self.interesting = interesting;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Depth limit actually enforced: 0 unless recursion is on.
    pub fn effective_max_depth(&self) -> usize {
        if self.recursive { self.max_depth } else { 0 }
    }

    /// Generator inputs with the built-in sets merged in.
    pub fn sources(&self) -> CandidateSources {
        CandidateSources::new(
            self.wordlist.clone(),
            self.extensions.clone().merged_with_common(self.no_common),
            self.directories.clone().merged_with_common(self.no_common),
        )
        .with_directory_extensions(self.directory_extensions)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ScanError::InvalidConfig(format!(
                "concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }
        if self.rate_limit == Some(0) {
            return Err(ScanError::InvalidConfig(
                "rate limit must be at least 1 request per second".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs one scan: the root scope first, then every discovered directory.
pub struct Scanner {
    config: ScanConfig,
    root: Target,
    sources: Arc<CandidateSources>,
    prober: Prober,
    scheduler: Scheduler,
    state: Arc<RunState>,
    cancel: CancelSignal,
}

impl Scanner {
    /// Validate the configuration and build the HTTP client. All fatal
    /// errors surface here, before any request is sent.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let root = Target::parse(&config.target)?;

        let sources = config.sources();
        if sources.wordlist.is_empty() && sources.directories.is_empty() {
            return Err(ScanError::NothingToGenerate);
        }

        let prober = Prober::new(&ProberOptions {
            method: config.method,
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            headers: config.headers.clone(),
        })?;

        let state = Arc::new(RunState::new());
        let cancel = CancelSignal::new();
        let scheduler = Scheduler::new(
            prober.clone(),
            config.concurrency,
            state.clone(),
            cancel.clone(),
        )?
        .with_rate_limit(config.rate_limit)
        .with_cancel_grace(config.cancel_grace);

        Ok(Self {
            config,
            root,
            sources: Arc::new(sources),
            prober,
            scheduler,
            state,
            cancel,
        })
    }

    pub fn target(&self) -> &Target {
        &self.root
    }

    /// Handle for stopping the run from outside (Ctrl-C, tests).
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    /// Upper bound of root-scope candidates, for progress display.
    pub fn estimated_root_candidates(&self) -> usize {
        Generator::new(self.root.clone(), self.sources.clone(), 0)
            .map(|generator| generator.estimated_len())
            .unwrap_or(0)
    }

    /// Run to completion or cancellation, streaming every result and warning
    /// into `events`. Cancellation is not an error: the returned summary has
    /// `cancelled` set.
    pub async fn run(&self, events: mpsc::Sender<ScanEvent>) -> Result<RunSnapshot> {
        info!(
            "Starting scan of {} with {} workers",
            self.root, self.config.concurrency
        );

        let timer = self.config.max_time.map(|budget| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(budget) => {
                        info!("Time budget of {:?} used up, stopping", budget);
                        cancel.cancel();
                    }
                    _ = cancel.cancelled() => {}
                }
            })
        });

        let outcome = self.run_scopes(&events).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        outcome?;

        if self.cancel.is_cancelled() {
            self.state.mark_cancelled();
        }
        let summary = self.state.snapshot();
        info!(
            "Scan finished: {} requests, {} hits, {} errors in {:?}{}",
            summary.requests,
            summary.hits,
            summary.errors,
            summary.elapsed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }

    /// Run and collect everything into a report.
    pub async fn scan(&self) -> Result<ScanReport> {
        let (tx, mut rx) = mpsc::channel(self.config.concurrency * 4);
        let mut report = ScanReport::new(self.root.as_str());

        let (summary, ()) = tokio::join!(self.run(tx), async {
            while let Some(event) = rx.recv().await {
                report.record(event);
            }
        });

        report.summary = summary?;
        Ok(report)
    }

    async fn run_scopes(&self, events: &mpsc::Sender<ScanEvent>) -> Result<()> {
        let mut controller = RecursionController::new(
            self.root.clone(),
            self.config.effective_max_depth(),
        )
        .with_warn_threshold(self.config.directory_warn_threshold);
        let probed = Arc::new(Mutex::new(HashSet::new()));

        while let Some(scope) = controller.next_scope() {
            if self.cancel.is_cancelled() {
                controller.abandon_queue();
                break;
            }

            info!("Scanning {} (depth {})", scope.target, scope.depth);
            let classifier = self.classifier_for(&scope, events).await;
            let generator =
                Generator::new(scope.target.clone(), self.sources.clone(), scope.depth)?;

            // Never probe a URL twice across scopes.
            let seen = probed.clone();
            let candidates = generator.candidates().filter(move |candidate| {
                seen.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(candidate.url().to_string())
            });

            let (tx, mut rx) = mpsc::channel(self.config.concurrency * 4);
            let scheduler = self.scheduler.clone();
            let classifier = Arc::new(classifier);
            let workers =
                tokio::spawn(async move { scheduler.run(candidates, classifier, tx).await });

            while let Some(result) = rx.recv().await {
                if let Some(directory) = result.directory.as_deref()
                    && let Offer::Queued(_) = controller.offer(scope.id, directory)
                {
                    self.state.record_directory_discovered();
                }
                let warning = controller.take_warning();

                // A dropped receiver only means nobody is listening any more.
                let _ = events.send(ScanEvent::Result(result)).await;
                if let Some(warning) = warning {
                    let _ = events.send(ScanEvent::Warning(warning)).await;
                }
            }

            let probes = workers.await??;
            controller.finish_scope(scope.id);
            if scope.depth > 0 {
                self.state.record_directory_scanned();
            }
            info!("Finished {}: {} probes", scope.target, probes);
        }

        if self.cancel.is_cancelled() {
            controller.abandon_queue();
        }
        debug!(
            "{} directories discovered, all scopes done: {}",
            controller.discovered(),
            controller.is_finished()
        );
        Ok(())
    }

    /// Calibrate the scope, falling back to status-only classification with
    /// one warning when that fails.
    async fn classifier_for(&self, scope: &Scope, events: &mpsc::Sender<ScanEvent>) -> Classifier {
        let calibration = tokio::select! {
            baseline = calibrate(&self.prober, &scope.target, &self.state) => Some(baseline),
            _ = self.cancel.cancelled() => None,
        };

        match calibration {
            Some(Ok(baseline)) => Classifier::new(baseline, self.config.interesting),
            // Cancelled: no candidate of this scope will be probed.
            None => Classifier::degraded(self.config.interesting),
            Some(Err(_)) if self.cancel.is_cancelled() => {
                Classifier::degraded(self.config.interesting)
            }
            Some(Err(reason)) => {
                warn!("Soft-404 calibration failed for {}: {}", scope.target, reason);
                let warning = ScanWarning::ClassificationDegraded {
                    scope: scope.target.to_string(),
                    reason,
                };
                let _ = events.send(ScanEvent::Warning(warning)).await;
                Classifier::degraded(self.config.interesting)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(entries: &[&str]) -> Wordlist {
        Wordlist::new(entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ScanConfig::new("http://example.test/");
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.cancel_grace, Duration::from_secs(2));
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.directory_warn_threshold, 100);
        assert_eq!(config.method, ProbeMethod::Get);
        assert!(!config.recursive);
        assert_eq!(config.effective_max_depth(), 0);
        assert!(config.user_agent.starts_with("Yori/"));
    }

    #[test]
    fn test_sources_merge_common_sets() {
        let config = ScanConfig::new("http://example.test/")
            .with_wordlist(words(&["index"]))
            .with_extensions(ExtensionSet::new([".asp", "php"]));
        let sources = config.sources();
        assert_eq!(sources.extensions.as_slice()[0], "asp");
        assert!(sources.extensions.as_slice().iter().any(|e| e == "bak"));
        assert!(sources.directories.as_slice().iter().any(|d| d == "admin"));

        let sources = config.with_no_common(true).sources();
        assert_eq!(sources.extensions.as_slice(), &["asp", "php"]);
        assert!(sources.directories.is_empty());
    }

    #[test]
    fn test_fatal_configuration_errors() {
        let zero_threads = ScanConfig::new("http://example.test/")
            .with_wordlist(words(&["a"]))
            .with_concurrency(0);
        assert!(matches!(
            Scanner::new(zero_threads),
            Err(ScanError::InvalidConfig(_))
        ));

        let too_many_threads = ScanConfig::new("http://example.test/")
            .with_wordlist(words(&["a"]))
            .with_concurrency(usize::MAX);
        assert!(matches!(
            Scanner::new(too_many_threads),
            Err(ScanError::InvalidConfig(_))
        ));
        let most_threads = ScanConfig::new("http://example.test/")
            .with_wordlist(words(&["a"]))
            .with_concurrency(MAX_CONCURRENCY);
        assert!(Scanner::new(most_threads).is_ok());

        let zero_rate = ScanConfig::new("http://example.test/")
            .with_wordlist(words(&["a"]))
            .with_rate_limit(Some(0));
        assert!(matches!(
            Scanner::new(zero_rate),
            Err(ScanError::InvalidConfig(_))
        ));

        let bad_scheme = ScanConfig::new("ftp://example.test/").with_wordlist(words(&["a"]));
        assert!(matches!(
            Scanner::new(bad_scheme),
            Err(ScanError::UnsupportedScheme(_))
        ));

        let relative = ScanConfig::new("/just/a/path").with_wordlist(words(&["a"]));
        assert!(matches!(
            Scanner::new(relative),
            Err(ScanError::InvalidUrl(_))
        ));

        let nothing = ScanConfig::new("http://example.test/").with_no_common(true);
        assert!(matches!(
            Scanner::new(nothing),
            Err(ScanError::NothingToGenerate)
        ));
    }

    #[test]
    fn test_recursion_depth_only_applies_when_enabled() {
        let config = ScanConfig::new("http://example.test/").with_recursion(true, 4);
        assert_eq!(config.effective_max_depth(), 4);
        let config = config.with_recursion(false, 4);
        assert_eq!(config.effective_max_depth(), 0);
    }
}
