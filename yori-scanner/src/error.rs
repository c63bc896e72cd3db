use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal errors. Everything here aborts a run before any candidate is probed.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported scheme '{0}': only http and https targets can be scanned")]
    UnsupportedScheme(String),

    #[error("Wordlist is empty")]
    EmptyWordlist,

    #[error("Nothing to generate: the wordlist and the directory list are both empty")]
    NothingToGenerate,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// True for errors caused by bad user input rather than the environment.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, ScanError::JoinError(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Per-probe failure. These never abort a run; they are recorded on the
/// `ProbeResult` of the candidate that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Cancelled,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(NetworkErrorKind::Cancelled, "probe aborted after cancellation")
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            NetworkErrorKind::Body
        } else {
            NetworkErrorKind::Request
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Request => "request",
            NetworkErrorKind::Body => "body",
            NetworkErrorKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}
