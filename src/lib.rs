//! # vq-curves
//!
//! Bitrate to quality curves for third-party video-quality datasets.
//!
//! Ingestion tools hand this library noisy `(bitrate, score)` measurements;
//! it turns them into compact curves that only ever go up, packages them with
//! provenance into a snapshot document, and publishes that document without
//! ever leaving the previous version unrecoverable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vq_curves::{CsvSampleReader, CurveBuilder, CurveProfile, Metric, Publisher, PublishConfig};
//! use vq_curves::snapshot::{SnapshotAssembler, SourceInfo};
//!
//! let batch = CsvSampleReader::auto_detect(Metric::Vmaf).read(&bytes)?;
//! let builder = CurveBuilder::new(CurveProfile::population(Metric::Vmaf));
//! let (curves, report) = builder.build(&batch);
//!
//! let snapshot = SnapshotAssembler::new(source, &builder.profile().sets)
//!     .curves(curves)
//!     .finish()?;
//!
//! let publisher = Publisher::new(PublishConfig::builder("public/curves.json").build());
//! publisher.publish(snapshot.to_json(true)?.as_bytes())?;
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`source`]: CSV exports and VMAF frame reports to raw samples
//! - [`fetch`]: Bounded-parallel retrieval with retry
//! - [`curve`]: Aggregation, isotonic regression, clamping and curve keys
//! - [`snapshot`]: Snapshot documents and merging
//! - [`publish`]: Atomic publishing with recovery copies
//! - [`stats`]: Summary statistics

pub mod curve;
pub mod error;
pub mod fetch;
pub mod publish;
pub mod snapshot;
pub mod source;
pub mod stats;

// Re-export commonly used types
pub use curve::{
    CenterStatistic, Curve, CurveBuilder, CurveGroupKey, CurveKey, CurveProfile, Metric, Point, RawSample,
    SampleBatch,
};
pub use error::{Error, Result};
pub use fetch::{FetchConfig, Fetcher, FsFetcher, RetryPolicy};
pub use publish::{PublishConfig, PublishOutcome, Publisher};
pub use snapshot::{MergedSnapshot, Snapshot, SnapshotAssembler, SourceInfo};
pub use source::{CsvSampleReader, CsvSchema, VmafIndex, VmafReport};
pub use stats::Summary;
