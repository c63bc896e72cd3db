use crate::error::NetworkError;
use crate::generator::Candidate;
use crate::prober::ProbeOutcome;
use crate::state::RunSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Hit,
    Miss,
    /// Success status, but indistinguishable from the scope's not-found page.
    SoftFour04,
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Hit => "hit",
            Classification::Miss => "miss",
            Classification::SoftFour04 => "soft_404",
            Classification::Error => "error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing one candidate. Exactly one per candidate attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub url: String,
    /// 0 when no response was received.
    pub status_code: u16,
    pub content_length: u64,
    pub elapsed: Duration,
    pub redirect: Option<String>,
    /// Set on hits that look like a directory worth descending into; holds
    /// the normalized directory URL.
    pub directory: Option<String>,
    pub classification: Classification,
    pub error: Option<NetworkError>,
}

impl ProbeResult {
    /// Assemble the result of a finished probe. `directory` is only kept on hits.
    pub fn from_outcome(
        candidate: Candidate,
        outcome: ProbeOutcome,
        classification: Classification,
        directory: Option<String>,
    ) -> Self {
        let url = candidate.url().to_string();
        match outcome {
            ProbeOutcome::Response(response) => Self {
                candidate,
                url,
                status_code: response.status,
                content_length: response.content_length,
                elapsed: response.elapsed,
                redirect: response.location,
                directory: directory.filter(|_| classification == Classification::Hit),
                classification,
                error: None,
            },
            ProbeOutcome::Failed { error, elapsed } => Self {
                candidate,
                url,
                status_code: 0,
                content_length: 0,
                elapsed,
                redirect: None,
                directory: None,
                classification: Classification::Error,
                error: Some(error),
            },
        }
    }

    pub fn is_hit(&self) -> bool {
        self.classification == Classification::Hit
    }

    pub fn is_directory_hit(&self) -> bool {
        self.is_hit() && self.directory.is_some()
    }
}

/// Non-fatal conditions surfaced to the result sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// Calibration failed for a scope; its results use the status-only rule.
    ClassificationDegraded { scope: String, reason: String },
    /// The discovered directory count crossed the warning threshold.
    ManyDirectories { count: usize },
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanWarning::ClassificationDegraded { scope, reason } => write!(
                f,
                "soft-404 calibration failed for {} ({}); classifying by status code only",
                scope, reason
            ),
            ScanWarning::ManyDirectories { count } => write!(
                f,
                "{} directories discovered so far; the scan will keep going",
                count
            ),
        }
    }
}

/// Everything a run emits, in arrival order.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Result(ProbeResult),
    Warning(ScanWarning),
}

/// Everything a finished run produced, collected in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: String,
    pub results: Vec<ProbeResult>,
    pub warnings: Vec<ScanWarning>,
    pub summary: RunSnapshot,
}

impl ScanReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            results: Vec::new(),
            warnings: Vec::new(),
            summary: RunSnapshot::default(),
        }
    }

    pub fn record(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Result(result) => self.results.push(result),
            ScanEvent::Warning(warning) => self.warnings.push(warning),
        }
    }

    pub fn hits(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.is_hit())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results
            .iter()
            .filter(|r| r.classification == Classification::Error)
    }

    /// Result for `url`, if it was probed.
    pub fn find(&self, url: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.url == url)
    }
}
