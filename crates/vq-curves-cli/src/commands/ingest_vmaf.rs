//! Per-clip curves from libvmaf frame reports.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;
use vq_curves::curve::{CurveProfile, Metric};
use vq_curves::fetch::{fetch_all, fetch_with_retry};
use vq_curves::snapshot::SourceInfo;
use vq_curves::source::VmafIndex;

use crate::net::{AutoFetcher, resolve};
use crate::{FetchArgs, SnapshotArgs};

pub fn run(index: &str, metric: &str, args: &SnapshotArgs, fetch: &FetchArgs) -> Result<()> {
    let metric: Metric = metric.parse()?;
    super::ensure_output_free(&args.output)?;
    let profile = super::curve_profile(CurveProfile::per_clip(metric), args)?;

    let config = super::fetch_config(fetch);
    let fetcher = AutoFetcher::new(config.timeout)?;
    let fetched_at = Utc::now();

    let body = fetch_with_retry(&fetcher, index, &config.retry)?;
    let entries = VmafIndex::read(&body).with_context(|| format!("Failed to read VMAF index {index}"))?;
    let locations: Vec<String> = entries.locations().into_iter().map(|l| resolve(index, l)).collect();

    debug!(reports = locations.len(), workers = config.workers, "fetching frame reports");
    let reports = fetch_all(&fetcher, &locations, &config)?;
    let batch = entries.samples(&reports, metric)?;

    let source = SourceInfo::new(&args.homepage, index, args.title.clone(), fetched_at);
    super::build_and_write(profile, &batch, source, args)?;
    Ok(())
}
