//! Curve construction profiles and the stage pipeline.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CenterStatistic, Curve, CurveKey, Metric, Point, SampleBatch, aggregate, clamp_round, isotonic};

/// Parameters that distinguish one ingestion source from another.
///
/// # Example
///
/// ```
/// use vq_curves::curve::{CenterStatistic, CurveProfile, Metric};
///
/// let profile = CurveProfile::builder(Metric::Ssim)
///     .center(CenterStatistic::Mean)
///     .min_points(3)
///     .sets(vec![2])
///     .build();
/// assert_eq!(profile.min_points, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveProfile {
    /// Metric being measured.
    pub metric: Metric,
    /// Statistic collapsing samples that share a bitrate.
    pub center: CenterStatistic,
    /// Minimum distinct bitrates for a group to be kept.
    pub min_points: usize,
    /// Compatibility `set` tags each curve is emitted under.
    pub sets: Vec<u8>,
}

impl CurveProfile {
    /// Population-level (codec-level) curves: median, at least 4 points.
    #[must_use]
    pub fn population(metric: Metric) -> Self {
        Self {
            metric,
            center: CenterStatistic::Median,
            min_points: 4,
            sets: vec![1],
        }
    }

    /// Per-clip curves: mean, at least 2 points.
    #[must_use]
    pub fn per_clip(metric: Metric) -> Self {
        Self {
            metric,
            center: CenterStatistic::Mean,
            min_points: 2,
            sets: vec![1],
        }
    }

    /// Start from [`CurveProfile::population`] and override fields.
    #[must_use]
    pub fn builder(metric: Metric) -> CurveProfileBuilder {
        CurveProfileBuilder {
            profile: Self::population(metric),
        }
    }
}

/// Builder for [`CurveProfile`].
#[derive(Debug, Clone)]
pub struct CurveProfileBuilder {
    profile: CurveProfile,
}

impl CurveProfileBuilder {
    /// Set the center statistic.
    #[must_use]
    pub fn center(mut self, center: CenterStatistic) -> Self {
        self.profile.center = center;
        self
    }

    /// Set the minimum number of distinct bitrates.
    #[must_use]
    pub fn min_points(mut self, min_points: usize) -> Self {
        self.profile.min_points = min_points;
        self
    }

    /// Set the compatibility tags.
    #[must_use]
    pub fn sets(mut self, sets: Vec<u8>) -> Self {
        self.profile.sets = sets;
        self
    }

    /// Build the profile.
    #[must_use]
    pub fn build(self) -> CurveProfile {
        self.profile
    }
}

/// Counts describing one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Raw samples consumed.
    pub samples: usize,
    /// Malformed records skipped upstream.
    pub skipped_records: usize,
    /// Distinct curve groups seen.
    pub groups: usize,
    /// Groups dropped for having too few distinct bitrates.
    pub dropped_groups: usize,
    /// Curves emitted.
    pub curves: usize,
    /// Points across all emitted curves.
    pub points: usize,
}

/// Runs aggregation, fitting, clamping and keying for one profile.
#[derive(Debug, Clone)]
pub struct CurveBuilder {
    profile: CurveProfile,
}

impl CurveBuilder {
    /// Create a builder for the given profile.
    #[must_use]
    pub fn new(profile: CurveProfile) -> Self {
        Self { profile }
    }

    /// The profile in use.
    #[must_use]
    pub fn profile(&self) -> &CurveProfile {
        &self.profile
    }

    /// Turn a batch of raw samples into finished curves, in first-seen group order.
    #[must_use]
    pub fn build(&self, batch: &SampleBatch) -> (Vec<Curve>, BuildReport) {
        let metric = self.profile.metric;
        let aggregation = aggregate(batch, self.profile.center, self.profile.min_points.max(1));

        let mut report = BuildReport {
            samples: batch.len(),
            skipped_records: batch.skipped,
            groups: aggregation.groups.len() + aggregation.dropped,
            dropped_groups: aggregation.dropped,
            ..BuildReport::default()
        };

        let mut curves = Vec::with_capacity(aggregation.groups.len());
        for group in &aggregation.groups {
            let fitted = isotonic::fit(&group.points);
            let points: Vec<Point> = fitted
                .iter()
                .map(|p| Point {
                    x: p.bitrate_kbps,
                    y: clamp_round(p.value, metric),
                })
                .collect();

            let CurveKey { key, label } = CurveKey::build(&group.key);
            debug!(%key, points = points.len(), "built curve");
            report.points += points.len();
            curves.push(Curve {
                metric,
                key,
                label,
                points,
            });
        }
        report.curves = curves.len();

        if report.dropped_groups > 0 {
            warn!(
                dropped = report.dropped_groups,
                min_points = self.profile.min_points,
                "dropped sparse curve groups"
            );
        }
        info!(
            metric = %metric,
            center = %self.profile.center,
            samples = report.samples,
            curves = report.curves,
            points = report.points,
            "curve build complete"
        );

        (curves, report)
    }
}
