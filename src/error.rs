//! Error types for vq-curves operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vq-curves operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or publishing curve snapshots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A raw input could not be retrieved or parsed after all retries.
    #[error("Source unavailable: {resource} (after {attempts} attempt(s)): {reason}")]
    SourceUnavailable {
        /// Path or URL of the resource.
        resource: String,
        /// Number of attempts made.
        attempts: u32,
        /// Reason for the last failure.
        reason: String,
    },

    /// A single raw record failed to parse.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// Line number of the record (1-based, header included).
        line: usize,
        /// Reason for the failure.
        reason: String,
    },

    /// The destination already exists and the operation refuses to overwrite it.
    #[error("Output already exists: {0}")]
    OutputConflict(PathBuf),

    /// A required CSV column could not be located.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Metric name not recognised.
    #[error("Unknown metric: {0} (expected vmaf or ssim)")]
    UnknownMetric(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A snapshot document violates a curve invariant.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Publishing the artifact failed.
    #[error("Publish failed for {path}: {reason}")]
    Publish {
        /// Target artifact path.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
