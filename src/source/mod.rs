//! Raw sample extraction.
//!
//! Adapters turning source files into a [`SampleBatch`](crate::curve::SampleBatch):
//!
//! - [`CsvSampleReader`]: per-test CSV exports, one measurement per row
//! - [`VmafIndex`] + [`VmafReport`]: a CSV listing encodes and the libvmaf
//!   JSON frame report of each
//!
//! Malformed rows are skipped and counted; a report that cannot be parsed
//! fails the run.

mod export;
mod vmaf;

pub use export::{CsvSampleReader, CsvSchema, CsvSchemaBuilder};
pub use vmaf::{PooledMetric, VmafFrame, VmafIndex, VmafIndexEntry, VmafReport};
