// Response classification and soft-404 calibration

use crate::prober::{ProbeOutcome, Prober, RawResponse};
use crate::result::Classification;
use crate::state::RunState;
use crate::target::Target;
use tracing::debug;
use uuid::Uuid;

/// Length slack when comparing a response against the not-found baseline.
/// Covers error pages that echo the requested path back.
pub const SOFT_404_LENGTH_TOLERANCE: u64 = 16;

/// Random paths probed per scope to learn its not-found response.
pub const CALIBRATION_PROBES: usize = 2;

/// How a scope answers requests for paths that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub status: u16,
    pub content_length: u64,
    /// `None` when the calibration bodies differed; matching then relies on
    /// status and length alone.
    pub content_hash: Option<u64>,
}

impl Baseline {
    /// Fold calibration responses into a baseline. Fails when the server did
    /// not answer the random paths consistently.
    pub fn from_responses(responses: &[RawResponse]) -> Result<Self, String> {
        let first = responses
            .first()
            .ok_or_else(|| "no calibration responses".to_string())?;

        if let Some(other) = responses.iter().find(|r| r.status != first.status) {
            return Err(format!(
                "unstable not-found status ({} and {})",
                first.status, other.status
            ));
        }

        let stable_body = responses
            .iter()
            .all(|r| r.content_hash == first.content_hash);

        Ok(Self {
            status: first.status,
            content_length: first.content_length,
            content_hash: stable_body.then_some(first.content_hash),
        })
    }

    pub fn matches(&self, response: &RawResponse) -> bool {
        response.status == self.status
            && response.content_length.abs_diff(self.content_length) <= SOFT_404_LENGTH_TOLERANCE
            && self
                .content_hash
                .is_none_or(|hash| hash == response.content_hash)
    }
}

/// Statuses that count as "something is there".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestingStatus {
    pub redirects: bool,
    pub forbidden: bool,
}

impl Default for InterestingStatus {
    fn default() -> Self {
        Self {
            redirects: true,
            forbidden: true,
        }
    }
}

impl InterestingStatus {
    pub fn contains(&self, status: u16) -> bool {
        match status {
            200..=299 => true,
            300..=399 => self.redirects,
            401 | 403 => self.forbidden,
            _ => false,
        }
    }
}

/// Classifies probe outcomes for one scope.
#[derive(Debug, Clone)]
pub struct Classifier {
    baseline: Option<Baseline>,
    interesting: InterestingStatus,
}

impl Classifier {
    pub fn new(baseline: Baseline, interesting: InterestingStatus) -> Self {
        Self {
            baseline: Some(baseline),
            interesting,
        }
    }

    /// Status-code-only classification, used when calibration failed.
    pub fn degraded(interesting: InterestingStatus) -> Self {
        Self {
            baseline: None,
            interesting,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.baseline.is_none()
    }

    pub fn classify(&self, outcome: &ProbeOutcome) -> Classification {
        match outcome {
            ProbeOutcome::Failed { .. } => Classification::Error,
            ProbeOutcome::Response(response) => self.classify_response(response),
        }
    }

    pub fn classify_response(&self, response: &RawResponse) -> Classification {
        if !self.interesting.contains(response.status) {
            return Classification::Miss;
        }
        match self.baseline {
            Some(baseline) if baseline.matches(response) => Classification::SoftFour04,
            _ => Classification::Hit,
        }
    }
}

/// Probe random, certainly-missing paths under `scope` and build its baseline.
/// Each request is counted on `state` as it goes out.
pub async fn calibrate(
    prober: &Prober,
    scope: &Target,
    state: &RunState,
) -> Result<Baseline, String> {
    let mut responses = Vec::with_capacity(CALIBRATION_PROBES);

    for _ in 0..CALIBRATION_PROBES {
        let canary = format!("{}", Uuid::new_v4().simple());
        let url = scope.resolve(&[canary], false);

        state.record_request();
        match prober.probe(&url).await {
            ProbeOutcome::Response(response) => responses.push(response),
            ProbeOutcome::Failed { error, .. } => {
                return Err(format!("calibration request failed: {}", error));
            }
        }
    }

    let baseline = Baseline::from_responses(&responses)?;
    debug!(
        "Baseline for {}: status {}, {} bytes, stable body: {}",
        scope,
        baseline.status,
        baseline.content_length,
        baseline.content_hash.is_some()
    );
    Ok(baseline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, NetworkErrorKind};
    use crate::prober::{ProberOptions, hash_body};
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn response(status: u16, content_length: u64, content_hash: u64) -> RawResponse {
        RawResponse {
            status,
            content_length,
            content_hash,
            location: None,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_soft_404_is_suppressed() {
        let baseline = Baseline {
            status: 200,
            content_length: 500,
            content_hash: Some(0xfeed),
        };
        let classifier = Classifier::new(baseline, InterestingStatus::default());

        assert_eq!(
            classifier.classify_response(&response(200, 500, 0xfeed)),
            Classification::SoftFour04
        );
    }

    #[test]
    fn test_different_body_is_a_hit() {
        let baseline = Baseline {
            status: 200,
            content_length: 500,
            content_hash: Some(0xfeed),
        };
        let classifier = Classifier::new(baseline, InterestingStatus::default());

        assert_eq!(
            classifier.classify_response(&response(200, 500, 0xbeef)),
            Classification::Hit
        );
        assert_eq!(
            classifier.classify_response(&response(200, 4000, 0xfeed)),
            Classification::Hit
        );
    }

    #[test]
    fn test_unstable_body_matches_on_length() {
        let baseline = Baseline {
            status: 200,
            content_length: 500,
            content_hash: None,
        };
        let classifier = Classifier::new(baseline, InterestingStatus::default());

        assert_eq!(
            classifier.classify_response(&response(200, 510, 1)),
            Classification::SoftFour04
        );
        assert_eq!(
            classifier.classify_response(&response(200, 900, 1)),
            Classification::Hit
        );
    }

    #[test]
    fn test_not_found_is_a_miss() {
        let baseline = Baseline {
            status: 404,
            content_length: 9,
            content_hash: Some(1),
        };
        let classifier = Classifier::new(baseline, InterestingStatus::default());

        assert_eq!(
            classifier.classify_response(&response(404, 9, 1)),
            Classification::Miss
        );
        assert_eq!(
            classifier.classify_response(&response(200, 120, 2)),
            Classification::Hit
        );
        assert_eq!(
            classifier.classify_response(&response(500, 120, 2)),
            Classification::Miss
        );
    }

    #[test]
    fn test_failed_probe_is_an_error() {
        let classifier = Classifier::degraded(InterestingStatus::default());
        let outcome = ProbeOutcome::Failed {
            error: NetworkError::new(NetworkErrorKind::Connect, "connection refused"),
            elapsed: Duration::from_millis(1),
        };
        assert_eq!(classifier.classify(&outcome), Classification::Error);
    }

    #[test]
    fn test_degraded_mode_uses_status_only() {
        let classifier = Classifier::degraded(InterestingStatus::default());
        assert!(classifier.is_degraded());
        assert_eq!(
            classifier.classify_response(&response(200, 500, 1)),
            Classification::Hit
        );
        assert_eq!(
            classifier.classify_response(&response(404, 500, 1)),
            Classification::Miss
        );
    }

    #[test]
    fn test_interesting_status_configuration() {
        let all = InterestingStatus::default();
        assert!(all.contains(204));
        assert!(all.contains(301));
        assert!(all.contains(403));
        assert!(!all.contains(404));
        assert!(!all.contains(500));

        let strict = InterestingStatus {
            redirects: false,
            forbidden: false,
        };
        assert!(strict.contains(200));
        assert!(!strict.contains(302));
        assert!(!strict.contains(401));
    }

    #[test]
    fn test_baseline_from_responses() {
        let stable =
            Baseline::from_responses(&[response(200, 50, 7), response(200, 50, 7)]).unwrap();
        assert_eq!(stable.content_hash, Some(7));

        let reflected =
            Baseline::from_responses(&[response(200, 50, 7), response(200, 52, 8)]).unwrap();
        assert_eq!(reflected.content_hash, None);

        assert!(Baseline::from_responses(&[response(200, 50, 7), response(404, 9, 1)]).is_err());
        assert!(Baseline::from_responses(&[]).is_err());
    }

    #[tokio::test]
    async fn test_calibrate_against_catch_all_server() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Page not found</h1>"))
            .mount(&mock_server)
            .await;

        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let scope = Target::parse(&mock_server.uri()).unwrap();
        let state = RunState::new();
        let baseline = calibrate(&prober, &scope, &state).await.unwrap();

        assert_eq!(state.snapshot().requests, CALIBRATION_PROBES);
        assert_eq!(baseline.status, 200);
        assert_eq!(baseline.content_length, 23);
        assert_eq!(baseline.content_hash, Some(hash_body(b"<h1>Page not found</h1>")));
    }

    #[tokio::test]
    async fn test_calibrate_with_real_404() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exists"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let scope = Target::parse(&mock_server.uri()).unwrap();
        let baseline = calibrate(&prober, &scope, &RunState::new()).await.unwrap();
        assert_eq!(baseline.status, 404);
    }

    #[tokio::test]
    async fn test_calibrate_unreachable_host_fails() {
        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let scope = Target::parse("http://127.0.0.1:9/").unwrap();
        let state = RunState::new();
        assert!(calibrate(&prober, &scope, &state).await.is_err());
        // The first failure ends calibration.
        assert_eq!(state.snapshot().requests, 1);
    }
}
