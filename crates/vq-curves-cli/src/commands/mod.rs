//! Subcommand implementations and the helpers they share.

pub mod ingest_csv;
pub mod ingest_vmaf;
pub mod inspect;
pub mod merge;
pub mod publish;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use vq_curves::curve::{CenterStatistic, CurveBuilder, CurveProfile, SampleBatch};
use vq_curves::fetch::{FetchConfig, RetryPolicy};
use vq_curves::snapshot::{Dataset, MergedSnapshot, Snapshot, SnapshotAssembler, SourceInfo};
use vq_curves::Error;

use crate::{FetchArgs, SnapshotArgs};

/// Refuse to run when the output already exists.
pub fn ensure_output_free(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::OutputConflict(path.to_path_buf()).into());
    }
    Ok(())
}

/// Write `contents` to a path that must not exist yet.
pub fn write_new(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => Error::OutputConflict(path.to_path_buf()),
            _ => Error::Io(e),
        })
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(())
}

/// One-line success summary.
pub fn written_line(path: &Path, datasets: usize, unique_keys: usize, points: usize) -> String {
    format!(
        "wrote {}: {} datasets, {} unique keys, {} points",
        path.display(),
        datasets,
        unique_keys,
        points
    )
}

pub fn print_written(path: &Path, datasets: usize, unique_keys: usize, points: usize) {
    println!("{}", written_line(path, datasets, unique_keys, points));
}

pub fn fetch_config(args: &FetchArgs) -> FetchConfig {
    FetchConfig {
        workers: args.workers.max(1),
        timeout: Duration::from_secs(args.timeout),
        retry: RetryPolicy {
            attempts: args.retries.max(1),
            ..RetryPolicy::default()
        },
    }
}

/// Apply command-line overrides to a preset profile.
pub fn curve_profile(mut profile: CurveProfile, args: &SnapshotArgs) -> Result<CurveProfile> {
    if let Some(center) = &args.center {
        profile.center = center.parse::<CenterStatistic>()?;
    }
    if let Some(min_points) = args.min_points {
        if min_points == 0 {
            bail!("--min-points must be at least 1");
        }
        profile.min_points = min_points;
    }
    if !args.sets.is_empty() {
        profile.sets.clone_from(&args.sets);
    }
    Ok(profile)
}

/// Build curves, assemble the snapshot and write it to `args.output`.
pub fn build_and_write(profile: CurveProfile, batch: &SampleBatch, source: SourceInfo, args: &SnapshotArgs) -> Result<()> {
    let builder = CurveBuilder::new(profile);
    let (curves, report) = builder.build(batch);
    tracing::debug!(?report, "build report");
    if curves.is_empty() {
        bail!(
            "No curves built from {} samples ({} groups below {} points)",
            report.samples,
            report.dropped_groups,
            builder.profile().min_points
        );
    }

    let snapshot = SnapshotAssembler::new(source, &builder.profile().sets)
        .curves(curves)
        .finish()?;
    write_new(&args.output, &snapshot.to_json(args.pretty)?)?;
    print_written(
        &args.output,
        snapshot.datasets.len(),
        snapshot.unique_keys(),
        snapshot.point_count(),
    );
    Ok(())
}

/// Datasets of a snapshot or merged snapshot file.
pub fn load_datasets(path: &Path) -> Result<Vec<Dataset>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if let Ok(snapshot) = serde_json::from_str::<Snapshot>(&content) {
        snapshot.validate()?;
        return Ok(snapshot.datasets);
    }
    let merged: MergedSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("{} is neither a snapshot nor a merged snapshot", path.display()))?;
    let datasets: Vec<Dataset> = merged.datasets.into_iter().map(|d| d.dataset).collect();
    for dataset in &datasets {
        dataset.validate()?;
    }
    Ok(datasets)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use vq_curves::curve::{CurveGroupKey, Metric, RawSample};
    use vq_curves::snapshot::merge;

    use super::*;

    fn snapshot_args(output: PathBuf) -> SnapshotArgs {
        SnapshotArgs {
            homepage: "https://example.org".to_string(),
            title: None,
            sets: Vec::new(),
            min_points: None,
            center: None,
            output,
            pretty: false,
        }
    }

    fn source() -> SourceInfo {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        SourceInfo::new("https://example.org", "https://example.org/export.csv", None, at)
    }

    fn batch(bitrates: &[f64]) -> SampleBatch {
        let mut batch = SampleBatch::default();
        let key = CurveGroupKey::new("x264", 1920, 1080);
        for (i, &kbps) in bitrates.iter().enumerate() {
            batch.push(key.clone(), RawSample::new(kbps, 30.0 + 10.0 * i as f64));
        }
        batch
    }

    fn is_output_conflict(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Error>(), Some(Error::OutputConflict(_)))
    }

    #[test]
    fn test_ensure_output_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        ensure_output_free(&path).unwrap();

        std::fs::write(&path, "{}").unwrap();
        let err = ensure_output_free(&path).unwrap_err();
        assert!(is_output_conflict(&err));
    }

    #[test]
    fn test_write_new_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_new(&path, "first").unwrap();

        let err = write_new(&path, "second").unwrap_err();
        assert!(is_output_conflict(&err));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn test_written_line() {
        assert_eq!(
            written_line(Path::new("out/curves.json"), 4, 2, 16),
            "wrote out/curves.json: 4 datasets, 2 unique keys, 16 points"
        );
    }

    #[test]
    fn test_build_and_write_refuses_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let args = snapshot_args(dir.path().join("out.json"));

        let result = build_and_write(
            CurveProfile::population(Metric::Vmaf),
            &batch(&[1000.0, 2000.0]),
            source(),
            &args,
        );
        assert!(result.is_err());
        assert!(!args.output.exists());
    }

    #[test]
    fn test_build_and_write_writes_valid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = snapshot_args(dir.path().join("out.json"));
        args.sets = vec![1, 2];
        let profile = curve_profile(CurveProfile::population(Metric::Vmaf), &args).unwrap();

        build_and_write(profile, &batch(&[1000.0, 2000.0, 3000.0, 4000.0]), source(), &args).unwrap();

        let snapshot = Snapshot::load(&args.output).unwrap();
        assert_eq!(snapshot.datasets.len(), 2);
        assert_eq!(snapshot.unique_keys(), 1);
        assert_eq!(snapshot.point_count(), 8);
    }

    #[test]
    fn test_curve_profile_overrides() {
        let mut args = snapshot_args(PathBuf::from("out.json"));
        args.center = Some("mean".to_string());
        args.min_points = Some(3);
        let profile = curve_profile(CurveProfile::population(Metric::Vmaf), &args).unwrap();
        assert_eq!(profile.center, CenterStatistic::Mean);
        assert_eq!(profile.min_points, 3);
        assert_eq!(profile.sets, vec![1]);

        args.min_points = Some(0);
        assert!(curve_profile(CurveProfile::population(Metric::Vmaf), &args).is_err());
    }

    #[test]
    fn test_load_datasets_accepts_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let (curves, _) = CurveBuilder::new(CurveProfile::population(Metric::Vmaf))
            .build(&batch(&[1000.0, 2000.0, 3000.0, 4000.0]));
        let snapshot = SnapshotAssembler::new(source(), &[1, 2])
            .curves(curves)
            .finish()
            .unwrap();

        let plain = dir.path().join("snapshot.json");
        std::fs::write(&plain, snapshot.to_json(false).unwrap()).unwrap();
        assert_eq!(load_datasets(&plain).unwrap().len(), 2);

        let merged = dir.path().join("merged.json");
        let document = merge(vec![snapshot.clone(), snapshot]);
        std::fs::write(&merged, document.to_json(true).unwrap()).unwrap();
        let datasets = load_datasets(&merged).unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].key, "x264-1920x1080");

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{\"datasets\": 3}").unwrap();
        assert!(load_datasets(&garbage).is_err());
    }
}
