//! Bitrate to quality curve construction.
//!
//! Raw `(bitrate, value)` observations pass through four stages:
//!
//! 1. [`aggregate`]: bucket by exact bitrate within each curve group and
//!    collapse each bucket to a weighted center value.
//! 2. [`isotonic::fit`]: weighted isotonic regression (pool-adjacent-violators)
//!    so quality never drops as bitrate rises.
//! 3. [`clamp_round`]: clamp to the metric domain, round to 3 decimals.
//! 4. [`CurveKey`]: stable key and label for the group.
//!
//! [`CurveBuilder`] composes the stages for one [`CurveProfile`].
//!
//! ## Example
//!
//! ```
//! use vq_curves::curve::{CurveBuilder, CurveGroupKey, CurveProfile, Metric, RawSample, SampleBatch};
//!
//! let key = CurveGroupKey::new("x264", 1920, 1080);
//! let mut batch = SampleBatch::default();
//! for (kbps, vmaf) in [(1000.0, 40.0), (2000.0, 35.0), (3000.0, 50.0), (4000.0, 45.0)] {
//!     batch.push(key.clone(), RawSample::new(kbps, vmaf));
//! }
//!
//! let (curves, report) = CurveBuilder::new(CurveProfile::population(Metric::Vmaf)).build(&batch);
//! assert_eq!(report.curves, 1);
//! let ys: Vec<f64> = curves[0].points.iter().map(|p| p.y).collect();
//! assert_eq!(ys, vec![37.5, 37.5, 47.5, 47.5]);
//! ```

mod aggregate;
mod builder;
pub mod isotonic;
mod key;
mod metric;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use aggregate::{AggregatedGroup, Aggregation, CenterStatistic, aggregate};
pub use builder::{BuildReport, CurveBuilder, CurveProfile, CurveProfileBuilder};
pub use key::{CurveKey, content_hash8, slugify};
pub use metric::{Metric, VALUE_DECIMALS, clamp_round};

/// One empirical observation. Implicit weight 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Encoded bitrate in kbps.
    pub bitrate_kbps: f64,
    /// Measured metric value.
    pub value: f64,
}

impl RawSample {
    /// Create a new sample.
    #[must_use]
    pub fn new(bitrate_kbps: f64, value: f64) -> Self {
        Self { bitrate_kbps, value }
    }
}

/// Identity of one curve.
///
/// Samples are only ever merged with samples carrying an equal key. Frame
/// rates compare by bit pattern, so `29.97` and `29.970001` are distinct
/// groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGroupKey {
    /// Codec or encoder identifier.
    pub codec: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate, when the source distinguishes it.
    pub fps: Option<f64>,
    /// Free-text content identifier (clip or test name).
    pub content: Option<String>,
}

impl CurveGroupKey {
    /// Create a key from codec and resolution.
    #[must_use]
    pub fn new(codec: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            codec: codec.into(),
            width,
            height,
            fps: None,
            content: None,
        }
    }

    /// Set the frame rate dimension.
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Set the content dimension.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

impl PartialEq for CurveGroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.codec == other.codec
            && self.width == other.width
            && self.height == other.height
            && self.fps.map(f64::to_bits) == other.fps.map(f64::to_bits)
            && self.content == other.content
    }
}

impl Eq for CurveGroupKey {}

impl Hash for CurveGroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.codec.hash(state);
        self.width.hash(state);
        self.height.hash(state);
        self.fps.map(f64::to_bits).hash(state);
        self.content.hash(state);
    }
}

/// A point carrying a weight, used both for aggregated and fitted points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    /// Bitrate in kbps.
    pub bitrate_kbps: f64,
    /// Center (aggregated) or fitted value.
    pub value: f64,
    /// Number of raw samples represented. Always positive.
    pub weight: f64,
}

impl WeightedPoint {
    /// Create a new weighted point.
    #[must_use]
    pub fn new(bitrate_kbps: f64, value: f64, weight: f64) -> Self {
        Self {
            bitrate_kbps,
            value,
            weight,
        }
    }
}

/// Output of the aggregator.
pub type AggregatedPoint = WeightedPoint;

/// Output of the isotonic fitter.
pub type FittedPoint = WeightedPoint;

/// A stored curve point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Bitrate in kbps.
    pub x: f64,
    /// Metric value.
    pub y: f64,
}

/// A finished curve: ascending unique `x`, non-decreasing in-domain `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Metric measured by `y`.
    pub metric: Metric,
    /// Stable identifier.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Points sorted by `x`.
    pub points: Vec<Point>,
}

/// Raw samples tagged with their curve group, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    /// Tagged samples.
    pub samples: Vec<(CurveGroupKey, RawSample)>,
    /// Malformed records skipped while extracting the samples.
    pub skipped: usize,
}

impl SampleBatch {
    /// Append one sample.
    pub fn push(&mut self, key: CurveGroupKey, sample: RawSample) {
        self.samples.push((key, sample));
    }

    /// Append every sample of another batch, summing skip counts.
    pub fn extend(&mut self, other: SampleBatch) {
        self.samples.extend(other.samples);
        self.skipped += other.skipped;
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
