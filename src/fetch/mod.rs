//! Bounded-parallel retrieval of raw inputs.
//!
//! Ingestion tools resolve every raw input before aggregation starts. Each
//! location is fetched with a small bounded retry; locations are fetched on a
//! dedicated pool of [`FetchConfig::workers`] threads. A failing fetch never
//! cancels its siblings, but any location that still fails after its retries
//! makes the whole run fail, since a partial dataset would bias the curves.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Retrieves the bytes behind a location (path or URL).
pub trait Fetcher: Send + Sync {
    /// Fetch one location.
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Reads locations as local file paths, optionally relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FsFetcher {
    base: Option<PathBuf>,
}

impl FsFetcher {
    /// Fetcher resolving relative paths against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher resolving relative paths against `base`.
    #[must_use]
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let path = match &self.base {
            Some(base) => base.join(location),
            None => PathBuf::from(location),
        };
        Ok(std::fs::read(path)?)
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No retries, no delay.
    #[must_use]
    pub fn none() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retrieval settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Concurrent fetches.
    pub workers: usize,
    /// Per-request timeout (honoured by network fetchers).
    pub timeout: Duration,
    /// Retry policy per location.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetch one location, retrying per `policy`.
///
/// The final failure is reported as [`Error::SourceUnavailable`].
pub fn fetch_with_retry(fetcher: &dyn Fetcher, location: &str, policy: &RetryPolicy) -> Result<Vec<u8>> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match fetcher.fetch(location) {
            Ok(bytes) => {
                debug!(location, attempt, bytes = bytes.len(), "fetched");
                return Ok(bytes);
            }
            Err(e) => {
                last_error = match e {
                    Error::SourceUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                };
                if attempt < attempts {
                    let delay = policy.delay_after(attempt);
                    warn!(location, attempt, error = %last_error, ?delay, "fetch failed, retrying");
                    thread::sleep(delay);
                }
            }
        }
    }

    Err(Error::SourceUnavailable {
        resource: location.to_string(),
        attempts,
        reason: last_error,
    })
}

/// Fetch every location on a pool of `config.workers` threads.
///
/// Results come back in input order. All fetches run to completion; if any
/// failed, the first failure in input order is returned.
pub fn fetch_all<S: AsRef<str> + Sync>(
    fetcher: &dyn Fetcher,
    locations: &[S],
    config: &FetchConfig,
) -> Result<Vec<Vec<u8>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .map_err(|e| Error::InvalidConfig(format!("fetch pool: {e}")))?;

    let results: Vec<Result<Vec<u8>>> = pool.install(|| {
        locations
            .par_iter()
            .map(|location| fetch_with_retry(fetcher, location.as_ref(), &config.retry))
            .collect()
    });

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(failed, total = locations.len(), "some sources could not be fetched");
    }
    results.into_iter().collect()
}
