use crate::error::{Result, ScanError};
use std::fmt;
use url::Url;

/// A normalized scan root: scheme, host, port and a base path that always
/// ends in exactly one `/`. Query and fragment are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("'{}': {}", raw, e)))?;
        Self::from_url(url)
    }

    fn from_url(mut url: Url) -> Result<Self> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ScanError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidUrl(format!("'{}' has no host", url)));
        }

        url.set_query(None);
        url.set_fragment(None);

        let mut path = collapse_slashes(url.path());
        if !path.ends_with('/') {
            path.push('/');
        }
        url.set_path(&path);

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// Resolve path segments below this root. Directories keep a trailing
    /// slash so that they are probed the way a server routes directories.
    pub fn resolve(&self, segments: &[String], directory: bool) -> String {
        let mut path = String::from(self.base_path());
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                path.push('/');
            }
            path.push_str(segment.trim_start_matches('/'));
        }
        if directory && !path.ends_with('/') {
            path.push('/');
        }

        let mut url = self.url.clone();
        url.set_path(&collapse_slashes(&path));
        url.to_string()
    }

    /// Re-root at a discovered directory. The directory must live on the same
    /// origin as this target.
    pub fn child(&self, directory_url: &str) -> Result<Self> {
        let child = Self::parse(directory_url)?;
        if child.url.origin() != self.url.origin() {
            return Err(ScanError::InvalidUrl(format!(
                "'{}' is not on the origin of '{}'",
                directory_url, self.url
            )));
        }
        Ok(child)
    }

    /// Path of `url` relative to this root, or `None` when it lives elsewhere.
    pub fn relative_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.as_str())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Canonical form of a directory URL: no query or fragment, no repeated
/// slashes, exactly one trailing slash.
pub fn normalize_directory_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    let mut path = collapse_slashes(url.path());
    if !path.ends_with('/') {
        path.push('/');
    }
    url.set_path(&path);
    Some(url.to_string())
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
