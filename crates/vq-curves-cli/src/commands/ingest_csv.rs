//! Population curves from per-test CSV exports.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;
use vq_curves::curve::{CurveProfile, Metric, SampleBatch};
use vq_curves::fetch::fetch_all;
use vq_curves::snapshot::SourceInfo;
use vq_curves::source::{CsvSampleReader, CsvSchema};

use crate::net::AutoFetcher;
use crate::{FetchArgs, SnapshotArgs};

/// Column overrides for the CSV reader.
pub struct Columns {
    pub codec: Option<String>,
    pub bitrate: Option<String>,
    pub value: Option<String>,
    pub bitrate_scale: f64,
}

impl Columns {
    fn schema(self) -> CsvSchema {
        let mut schema = CsvSchema::builder().bitrate_scale(self.bitrate_scale);
        if let Some(col) = self.codec {
            schema = schema.codec_column(col);
        }
        if let Some(col) = self.bitrate {
            schema = schema.bitrate_column(col);
        }
        if let Some(col) = self.value {
            schema = schema.value_column(col);
        }
        schema.build()
    }
}

pub fn run(inputs: &[String], metric: &str, columns: Columns, args: &SnapshotArgs, fetch: &FetchArgs) -> Result<()> {
    let metric: Metric = metric.parse()?;
    super::ensure_output_free(&args.output)?;
    let profile = super::curve_profile(CurveProfile::population(metric), args)?;

    let config = super::fetch_config(fetch);
    let fetcher = AutoFetcher::new(config.timeout)?;
    let fetched_at = Utc::now();
    debug!(inputs = inputs.len(), workers = config.workers, "fetching CSV exports");
    let bodies = fetch_all(&fetcher, inputs, &config)?;

    let reader = CsvSampleReader::new(columns.schema(), metric);
    let mut batch = SampleBatch::default();
    for (input, body) in inputs.iter().zip(&bodies) {
        let part = reader
            .read(body)
            .with_context(|| format!("Failed to read CSV from {input}"))?;
        debug!(input = %input, samples = part.len(), skipped = part.skipped, "read export");
        batch.extend(part);
    }

    let source = SourceInfo::new(&args.homepage, inputs.join(" "), args.title.clone(), fetched_at);
    super::build_and_write(profile, &batch, source, args)?;
    Ok(())
}
