use crate::error::{NetworkError, Result, ScanError};
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue, LOCATION};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("Yori/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    #[default]
    Get,
    /// Existence check only; no body, so no content hash.
    Head,
}

#[derive(Debug, Clone)]
pub struct ProberOptions {
    pub method: ProbeMethod,
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Default for ProberOptions {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Get,
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

/// What came back from the server, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_length: u64,
    pub content_hash: u64,
    /// `Location` header of a redirect. Redirects are never followed.
    pub location: Option<String>,
    pub elapsed: Duration,
}

impl RawResponse {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Response(RawResponse),
    Failed {
        error: NetworkError,
        elapsed: Duration,
    },
}

impl ProbeOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            ProbeOutcome::Response(response) => response.elapsed,
            ProbeOutcome::Failed { elapsed, .. } => *elapsed,
        }
    }
}

/// Executes single requests. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    method: ProbeMethod,
    timeout: Duration,
}

impl Prober {
    pub fn new(options: &ProberOptions) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
                ScanError::InvalidConfig(format!("invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value.trim()).map_err(|e| {
                ScanError::InvalidConfig(format!("invalid value for header '{}': {}", name, e))
            })?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .default_headers(default_headers)
            .connect_timeout(options.timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            method: options.method,
            timeout: options.timeout,
        })
    }

    /// Issue one request. Network failures come back as `ProbeOutcome::Failed`.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.fetch(url, start).await {
            Ok(response) => {
                debug!(
                    "{} {} -> {} ({} bytes, {:?})",
                    self.verb(),
                    url,
                    response.status,
                    response.content_length,
                    response.elapsed
                );
                ProbeOutcome::Response(response)
            }
            Err(e) => {
                let error = NetworkError::from_reqwest(&e);
                debug!("{} {} failed: {}", self.verb(), url, error);
                ProbeOutcome::Failed {
                    error,
                    elapsed: start.elapsed(),
                }
            }
        }
    }

    async fn fetch(&self, url: &str, start: Instant) -> reqwest::Result<RawResponse> {
        let request = match self.method {
            ProbeMethod::Get => self.client.get(url),
            ProbeMethod::Head => self.client.head(url),
        };
        let response = request.timeout(self.timeout).send().await?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let (content_length, content_hash) = match self.method {
            ProbeMethod::Get => {
                let body = response.bytes().await?;
                (body.len() as u64, hash_body(&body))
            }
            ProbeMethod::Head => {
                let length = response
                    .headers()
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                (length, 0)
            }
        };

        Ok(RawResponse {
            status,
            content_length,
            content_hash,
            location,
            elapsed: start.elapsed(),
        })
    }

    fn verb(&self) -> &'static str {
        match self.method {
            ProbeMethod::Get => "GET",
            ProbeMethod::Head => "HEAD",
        }
    }
}

pub fn hash_body(body: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn test_probe_captures_status_length_and_hash() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret panel"))
            .mount(&mock_server)
            .await;

        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let outcome = prober
            .probe(&format!("{}/admin.php", mock_server.uri()))
            .await;

        match outcome {
            ProbeOutcome::Response(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.content_length, 12);
                assert_eq!(response.content_hash, hash_body(b"secret panel"));
                assert!(response.location.is_none());
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_does_not_follow_redirects() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/img/"))
            .mount(&mock_server)
            .await;

        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let outcome = prober.probe(&format!("{}/img", mock_server.uri())).await;

        match outcome {
            ProbeOutcome::Response(response) => {
                assert_eq!(response.status, 301);
                assert!(response.is_redirect());
                assert_eq!(response.location.as_deref(), Some("/img/"));
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_head_uses_content_length_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/backup.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; 2048]))
            .mount(&mock_server)
            .await;

        let options = ProberOptions {
            method: ProbeMethod::Head,
            ..ProberOptions::default()
        };
        let prober = Prober::new(&options).unwrap();
        let outcome = prober
            .probe(&format!("{}/backup.zip", mock_server.uri()))
            .await;

        match outcome {
            ProbeOutcome::Response(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.content_length, 2048);
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_timeout_is_a_value() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let options = ProberOptions {
            timeout: Duration::from_millis(50),
            ..ProberOptions::default()
        };
        let prober = Prober::new(&options).unwrap();
        let outcome = prober.probe(&format!("{}/slow", mock_server.uri())).await;

        match outcome {
            ProbeOutcome::Failed { error, .. } => assert_eq!(error.kind, NetworkErrorKind::Timeout),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_a_value() {
        // Nothing listens on port 9 of localhost in test environments.
        let prober = Prober::new(&ProberOptions::default()).unwrap();
        let outcome = prober.probe("http://127.0.0.1:9/").await;
        assert!(matches!(outcome, ProbeOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_probe_sends_configured_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "hunter2"))
            .and(header("user-agent", "yori-test"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let options = ProberOptions {
            user_agent: "yori-test".to_string(),
            headers: vec![("X-Api-Key".to_string(), "hunter2".to_string())],
            ..ProberOptions::default()
        };
        let prober = Prober::new(&options).unwrap();
        let outcome = prober.probe(&format!("{}/", mock_server.uri())).await;

        match outcome {
            ProbeOutcome::Response(response) => assert_eq!(response.status, 204),
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let options = ProberOptions {
            headers: vec![("bad header".to_string(), "x".to_string())],
            ..ProberOptions::default()
        };
        assert!(matches!(
            Prober::new(&options),
            Err(ScanError::InvalidConfig(_))
        ));
    }
}
