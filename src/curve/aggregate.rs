//! Exact-bitrate bucketing and center statistics.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AggregatedPoint, CurveGroupKey, SampleBatch};
use crate::error::{Error, Result};
use crate::stats;

/// Statistic used to collapse samples sharing a bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterStatistic {
    /// Median. Suited to repeated test runs with systematic spread.
    #[default]
    Median,
    /// Arithmetic mean. Suited to many near-identical frame scores.
    Mean,
}

impl CenterStatistic {
    /// Center of the finite values, `None` when there are none.
    #[must_use]
    pub fn center(self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Median => stats::median(values),
            Self::Mean => stats::mean(values),
        }
    }
}

impl fmt::Display for CenterStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Median => f.write_str("median"),
            Self::Mean => f.write_str("mean"),
        }
    }
}

impl FromStr for CenterStatistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "mean" | "average" => Ok(Self::Mean),
            other => Err(Error::InvalidConfig(format!(
                "unknown center statistic: {other}"
            ))),
        }
    }
}

/// One curve group after aggregation.
#[derive(Debug, Clone)]
pub struct AggregatedGroup {
    /// Group identity.
    pub key: CurveGroupKey,
    /// Points sorted ascending by bitrate, one per distinct bitrate.
    pub points: Vec<AggregatedPoint>,
}

/// Result of aggregating a batch.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Surviving groups in first-seen order.
    pub groups: Vec<AggregatedGroup>,
    /// Groups dropped for having fewer than the minimum distinct bitrates.
    pub dropped: usize,
}

/// Bucket samples by exact bitrate within each group and collapse buckets.
///
/// Samples with a non-positive or non-finite bitrate are ignored, and so are
/// non-finite metric values. A bucket left with no finite value produces no
/// point. Groups with fewer than `min_points` distinct bitrates are dropped
/// and counted.
#[must_use]
pub fn aggregate(batch: &SampleBatch, center: CenterStatistic, min_points: usize) -> Aggregation {
    // group index -> (bitrate bits -> values), groups kept in first-seen order
    let mut index: HashMap<&CurveGroupKey, usize> = HashMap::new();
    let mut buckets: Vec<(&CurveGroupKey, HashMap<u64, Vec<f64>>)> = Vec::new();

    for (key, sample) in &batch.samples {
        if !(sample.bitrate_kbps.is_finite() && sample.bitrate_kbps > 0.0) {
            continue;
        }
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push((key, HashMap::new()));
            buckets.len() - 1
        });
        buckets[slot]
            .1
            .entry(sample.bitrate_kbps.to_bits())
            .or_default()
            .push(sample.value);
    }

    let mut aggregation = Aggregation::default();
    for (key, by_bitrate) in buckets {
        let mut points: Vec<AggregatedPoint> = by_bitrate
            .into_iter()
            .filter_map(|(bits, values)| {
                let finite = values.iter().filter(|v| v.is_finite()).count();
                let value = center.center(&values)?;
                Some(AggregatedPoint::new(f64::from_bits(bits), value, finite as f64))
            })
            .collect();

        if points.len() < min_points {
            debug!(
                codec = %key.codec,
                width = key.width,
                height = key.height,
                points = points.len(),
                min_points,
                "dropping sparse curve group"
            );
            aggregation.dropped += 1;
            continue;
        }

        points.sort_by(|a, b| a.bitrate_kbps.total_cmp(&b.bitrate_kbps));
        aggregation.groups.push(AggregatedGroup {
            key: key.clone(),
            points,
        });
    }

    aggregation
}
