//! Canonical snapshot documents.
//!
//! A [`Snapshot`] packages every curve of one ingestion run together with the
//! provenance of its source. It is built in memory, validated, and only then
//! serialized; it is never amended in place.
//!
//! ```json
//! {
//!   "source": { "homepageUrl": "...", "dataUrl": "...", "title": null, "fetchedAtIso": "..." },
//!   "datasets": [ { "set": 1, "metric": "vmaf", "key": "...", "label": "...", "points": [ { "x": 1000, "y": 37.5 } ] } ]
//! }
//! ```

mod merge;

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use merge::{MergedDataset, MergedSnapshot, merge};

use crate::curve::{Curve, Metric, Point};
use crate::error::{Error, Result};

/// Provenance of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    /// Human-facing page of the dataset.
    pub homepage_url: String,
    /// Location the raw data was retrieved from.
    pub data_url: String,
    /// Dataset title, if the source names one.
    pub title: Option<String>,
    /// Retrieval time, ISO-8601 UTC.
    pub fetched_at_iso: String,
}

impl SourceInfo {
    /// Create provenance stamped with the given retrieval time.
    #[must_use]
    pub fn new(
        homepage_url: impl Into<String>,
        data_url: impl Into<String>,
        title: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            homepage_url: homepage_url.into(),
            data_url: data_url.into(),
            title,
            fetched_at_iso: fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Compatibility `set` tags a dataset may carry.
pub const SET_TAGS: [u8; 2] = [1, 2];

/// One curve as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Compatibility tag, one of [`SET_TAGS`].
    pub set: u8,
    /// Metric measured by `y`.
    pub metric: Metric,
    /// Stable curve identifier.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Points sorted ascending by `x`.
    pub points: Vec<Point>,
}

impl Dataset {
    /// Check the curve invariants of this dataset.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| -> Result<()> {
            Err(Error::InvalidSnapshot(format!("{}: {reason}", self.key)))
        };

        if self.key.is_empty() {
            return Err(Error::InvalidSnapshot("dataset with empty key".to_string()));
        }
        if !SET_TAGS.contains(&self.set) {
            return fail(format!("set {} is not one of {:?}", self.set, SET_TAGS));
        }
        if let Some(p) = self.points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return fail(format!("non-finite point ({}, {})", p.x, p.y));
        }
        if let Some(w) = self.points.windows(2).find(|w| w[0].x >= w[1].x) {
            return fail(format!("x not strictly ascending at {} -> {}", w[0].x, w[1].x));
        }
        if let Some(w) = self.points.windows(2).find(|w| w[0].y > w[1].y) {
            return fail(format!("y decreases at x={} ({} -> {})", w[1].x, w[0].y, w[1].y));
        }
        if let Some(p) = self.points.iter().find(|p| !self.metric.contains(p.y)) {
            return fail(format!("y={} outside {} domain", p.y, self.metric));
        }
        Ok(())
    }
}

/// A complete snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Provenance.
    pub source: SourceInfo,
    /// Curves, in deterministic order.
    pub datasets: Vec<Dataset>,
}

impl Snapshot {
    /// Check every dataset and that `(set, key)` is unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            dataset.validate()?;
            if !seen.insert((dataset.set, dataset.key.as_str())) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate key {} in set {}",
                    dataset.key, dataset.set
                )));
            }
        }
        Ok(())
    }

    /// Number of distinct keys across all sets.
    #[must_use]
    pub fn unique_keys(&self) -> usize {
        self.datasets
            .iter()
            .map(|d| d.key.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Total points across all datasets.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.datasets.iter().map(|d| d.points.len()).sum()
    }

    /// Serialize to JSON with a trailing newline.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let mut json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        json.push('\n');
        Ok(json)
    }

    /// Load and validate a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Folds curves and provenance into a [`Snapshot`].
///
/// Datasets are ordered by set tag (in the order given), then by curve
/// insertion order, so identical inputs serialize identically.
#[derive(Debug, Clone)]
pub struct SnapshotAssembler {
    source: SourceInfo,
    sets: Vec<u8>,
    curves: Vec<Curve>,
}

impl SnapshotAssembler {
    /// Start a snapshot for `source`, emitting each curve under every tag in `sets`.
    #[must_use]
    pub fn new(source: SourceInfo, sets: &[u8]) -> Self {
        let mut unique = Vec::with_capacity(sets.len());
        for &set in sets {
            if !unique.contains(&set) {
                unique.push(set);
            }
        }
        Self {
            source,
            sets: unique,
            curves: Vec::new(),
        }
    }

    /// Append curves, keeping their order.
    #[must_use]
    pub fn curves(mut self, curves: impl IntoIterator<Item = Curve>) -> Self {
        self.curves.extend(curves);
        self
    }

    /// Assemble and validate the snapshot.
    pub fn finish(self) -> Result<Snapshot> {
        let mut datasets = Vec::with_capacity(self.curves.len() * self.sets.len());
        for &set in &self.sets {
            for curve in &self.curves {
                datasets.push(Dataset {
                    set,
                    metric: curve.metric,
                    key: curve.key.clone(),
                    label: curve.label.clone(),
                    points: curve.points.clone(),
                });
            }
        }

        let snapshot = Snapshot {
            source: self.source,
            datasets,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn source() -> SourceInfo {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        SourceInfo::new("https://example.org", "https://example.org/data.csv", None, at)
    }

    fn curve(key: &str, ys: &[f64]) -> Curve {
        Curve {
            metric: Metric::Vmaf,
            key: key.to_string(),
            label: key.to_uppercase(),
            points: ys
                .iter()
                .enumerate()
                .map(|(i, &y)| Point {
                    x: 1000.0 * (i + 1) as f64,
                    y,
                })
                .collect(),
        }
    }

    #[test]
    fn test_source_info_timestamp_format() {
        assert_eq!(source().fetched_at_iso, "2026-10-19T08:30:00.000Z");
    }

    #[test]
    fn test_assembler_orders_by_set_then_insertion() {
        let snapshot = SnapshotAssembler::new(source(), &[1, 2, 1])
            .curves(vec![curve("b", &[1.0, 2.0]), curve("a", &[3.0, 4.0])])
            .finish()
            .unwrap();

        let order: Vec<(u8, &str)> = snapshot
            .datasets
            .iter()
            .map(|d| (d.set, d.key.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "b"), (1, "a"), (2, "b"), (2, "a")]);
        assert_eq!(snapshot.unique_keys(), 2);
        assert_eq!(snapshot.point_count(), 8);
    }

    #[test]
    fn test_assembler_rejects_duplicate_keys() {
        let result = SnapshotAssembler::new(source(), &[1])
            .curves(vec![curve("a", &[1.0, 2.0]), curve("a", &[3.0, 4.0])])
            .finish();
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_assembler_rejects_unknown_set_tag() {
        for set in [0, 3, 7] {
            let result = SnapshotAssembler::new(source(), &[set])
                .curves(vec![curve("a", &[1.0, 2.0])])
                .finish();
            assert!(matches!(result, Err(Error::InvalidSnapshot(_))), "set {set} accepted");
        }
    }

    #[test]
    fn test_load_rejects_unknown_set_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let mut snapshot = SnapshotAssembler::new(source(), &[1])
            .curves(vec![curve("a", &[1.0, 2.0])])
            .finish()
            .unwrap();
        snapshot.datasets[0].set = 7;
        std::fs::write(&path, snapshot.to_json(false).unwrap()).unwrap();

        assert!(matches!(Snapshot::load(&path), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_validate_rejects_decreasing_y() {
        let dataset = Dataset {
            set: 1,
            metric: Metric::Vmaf,
            key: "k".to_string(),
            label: "k".to_string(),
            points: vec![Point { x: 1.0, y: 50.0 }, Point { x: 2.0, y: 40.0 }],
        };
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_domain_and_duplicate_x() {
        let mut dataset = Dataset {
            set: 1,
            metric: Metric::Ssim,
            key: "k".to_string(),
            label: "k".to_string(),
            points: vec![Point { x: 1.0, y: 0.5 }, Point { x: 2.0, y: 1.5 }],
        };
        assert!(dataset.validate().is_err());

        dataset.points = vec![Point { x: 1.0, y: 0.5 }, Point { x: 1.0, y: 0.6 }];
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_json_field_names() {
        let snapshot = SnapshotAssembler::new(source(), &[2])
            .curves(vec![curve("x264-1920x1080", &[37.5, 47.5])])
            .finish()
            .unwrap();
        let json = snapshot.to_json(false).unwrap();

        assert!(json.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source"]["homepageUrl"], "https://example.org");
        assert_eq!(value["source"]["dataUrl"], "https://example.org/data.csv");
        assert!(value["source"]["title"].is_null());
        assert_eq!(value["source"]["fetchedAtIso"], "2026-10-19T08:30:00.000Z");
        assert_eq!(value["datasets"][0]["set"], 2);
        assert_eq!(value["datasets"][0]["metric"], "vmaf");
        assert_eq!(value["datasets"][0]["points"][1]["y"], 47.5);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let build = || {
            SnapshotAssembler::new(source(), &[1, 2])
                .curves(vec![curve("a", &[1.0, 2.0]), curve("b", &[3.0, 4.0])])
                .finish()
                .unwrap()
                .to_json(true)
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let snapshot = SnapshotAssembler::new(source(), &[1])
            .curves(vec![curve("a", &[1.0, 2.0])])
            .finish()
            .unwrap();
        std::fs::write(&path, snapshot.to_json(true).unwrap()).unwrap();

        assert_eq!(Snapshot::load(&path).unwrap(), snapshot);
    }
}
