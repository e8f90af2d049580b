//! Network-aware fetchers.

use std::time::Duration;

use vq_curves::error::{Error, Result};
use vq_curves::fetch::{Fetcher, FsFetcher};

/// Blocking HTTP(S) fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vq-curves/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let unavailable = |reason: String| Error::SourceUnavailable {
            resource: location.to_string(),
            attempts: 1,
            reason,
        };

        let response = self
            .client
            .get(location)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| unavailable(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Sends `http(s)://` locations to [`HttpFetcher`] and everything else to the filesystem.
pub struct AutoFetcher {
    http: HttpFetcher,
    fs: FsFetcher,
}

impl AutoFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            fs: FsFetcher::new(),
        })
    }
}

impl Fetcher for AutoFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_url(location) {
            self.http.fetch(location)
        } else {
            self.fs.fetch(location)
        }
    }
}

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolve `location` against the location of the document that referenced it.
///
/// URLs and absolute paths are returned unchanged.
pub fn resolve(base: &str, location: &str) -> String {
    if is_url(location) || std::path::Path::new(location).is_absolute() {
        return location.to_string();
    }
    if is_url(base) {
        return match reqwest::Url::parse(base).and_then(|url| url.join(location)) {
            Ok(url) => url.to_string(),
            Err(_) => location.to_string(),
        };
    }
    match std::path::Path::new(base).parent() {
        Some(dir) => dir.join(location).to_string_lossy().into_owned(),
        None => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_url() {
        assert_eq!(
            resolve("https://example.org/data/index.csv", "reports/a.json"),
            "https://example.org/data/reports/a.json"
        );
        assert_eq!(
            resolve("https://example.org/index.csv", "https://cdn.example.org/a.json"),
            "https://cdn.example.org/a.json"
        );
    }

    #[test]
    fn test_resolve_against_url_without_path() {
        assert_eq!(resolve("https://example.org", "reports/a.json"), "https://example.org/reports/a.json");
        assert_eq!(resolve("https://example.org/", "reports/a.json"), "https://example.org/reports/a.json");
    }

    #[test]
    fn test_resolve_ignores_query_slashes() {
        assert_eq!(
            resolve("https://example.org/data/index.csv?from=a/b", "a.json"),
            "https://example.org/data/a.json"
        );
    }

    #[test]
    fn test_resolve_relative_to_path() {
        assert_eq!(resolve("data/index.csv", "reports/a.json"), "data/reports/a.json");
        assert_eq!(resolve("index.csv", "a.json"), "a.json");
        assert_eq!(resolve("data/index.csv", "/abs/a.json"), "/abs/a.json");
    }

    #[test]
    fn test_auto_fetcher_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, b"codec\n").unwrap();

        let fetcher = AutoFetcher::new(Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).unwrap(), b"codec\n");
    }
}
