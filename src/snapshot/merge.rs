//! Combining independently produced snapshots.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Dataset, Snapshot, SourceInfo};
use crate::error::Result;

/// A dataset tagged with the index of the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDataset {
    /// Index into [`MergedSnapshot::sources`].
    pub source_index: usize,
    /// The dataset itself.
    #[serde(flatten)]
    pub dataset: Dataset,
}

/// The union of several snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSnapshot {
    /// Provenance of every input, in input order.
    pub sources: Vec<SourceInfo>,
    /// Datasets of every input, in input order.
    pub datasets: Vec<MergedDataset>,
}

impl MergedSnapshot {
    /// Total points across all datasets.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.datasets.iter().map(|d| d.dataset.points.len()).sum()
    }

    /// Number of distinct keys across all sets.
    #[must_use]
    pub fn unique_keys(&self) -> usize {
        self.datasets
            .iter()
            .map(|d| d.dataset.key.as_str())
            .collect::<HashSet<_>>()
            .len()
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
}

/// Merge snapshots in order.
///
/// When two inputs carry the same `(set, key)`, the first one wins and the
/// later dataset is skipped with a warning.
#[must_use]
pub fn merge(snapshots: Vec<Snapshot>) -> MergedSnapshot {
    let mut seen: HashSet<(u8, String)> = HashSet::new();
    let mut merged = MergedSnapshot {
        sources: Vec::with_capacity(snapshots.len()),
        datasets: Vec::new(),
    };

    for (source_index, snapshot) in snapshots.into_iter().enumerate() {
        merged.sources.push(snapshot.source);
        for dataset in snapshot.datasets {
            if !seen.insert((dataset.set, dataset.key.clone())) {
                warn!(
                    key = %dataset.key,
                    set = dataset.set,
                    source_index,
                    "duplicate dataset skipped during merge"
                );
                continue;
            }
            merged.datasets.push(MergedDataset {
                source_index,
                dataset,
            });
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Metric, Point};

    fn snapshot(url: &str, keys: &[(u8, &str)]) -> Snapshot {
        Snapshot {
            source: SourceInfo {
                homepage_url: url.to_string(),
                data_url: format!("{url}/data"),
                title: Some(url.to_string()),
                fetched_at_iso: "2026-10-19T00:00:00.000Z".to_string(),
            },
            datasets: keys
                .iter()
                .map(|&(set, key)| Dataset {
                    set,
                    metric: Metric::Vmaf,
                    key: key.to_string(),
                    label: key.to_string(),
                    points: vec![Point { x: 1.0, y: 10.0 }, Point { x: 2.0, y: 20.0 }],
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_keeps_order_and_sources() {
        let merged = merge(vec![
            snapshot("https://a", &[(1, "x"), (1, "y")]),
            snapshot("https://b", &[(1, "z")]),
        ]);

        assert_eq!(merged.sources.len(), 2);
        let order: Vec<(usize, &str)> = merged
            .datasets
            .iter()
            .map(|d| (d.source_index, d.dataset.key.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "x"), (0, "y"), (1, "z")]);
        assert_eq!(merged.point_count(), 6);
    }

    #[test]
    fn test_merge_first_wins_per_set() {
        let merged = merge(vec![
            snapshot("https://a", &[(1, "x")]),
            snapshot("https://b", &[(1, "x"), (2, "x")]),
        ]);

        assert_eq!(merged.datasets.len(), 2);
        assert_eq!(merged.datasets[0].source_index, 0);
        assert_eq!(merged.datasets[1].dataset.set, 2);
        assert_eq!(merged.unique_keys(), 1);
    }

    #[test]
    fn test_merged_json_flattens_dataset() {
        let merged = merge(vec![snapshot("https://a", &[(1, "x")])]);
        let value: serde_json::Value = serde_json::from_str(&merged.to_json(false).unwrap()).unwrap();

        assert_eq!(value["datasets"][0]["sourceIndex"], 0);
        assert_eq!(value["datasets"][0]["key"], "x");
        assert_eq!(value["sources"][0]["homepageUrl"], "https://a");
    }
}
