//! Quality metric identifiers and their value domains.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimal digits kept for stored curve values.
pub const VALUE_DECIMALS: i32 = 3;

/// Quality metric a curve measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// VMAF, domain `[0, 100]`.
    Vmaf,
    /// SSIM, domain `[0, 1]`.
    Ssim,
}

impl Metric {
    /// Lowercase identifier as written in snapshots.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vmaf => "vmaf",
            Self::Ssim => "ssim",
        }
    }

    /// Closed value domain `(min, max)`.
    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        match self {
            Self::Vmaf => (0.0, 100.0),
            Self::Ssim => (0.0, 1.0),
        }
    }

    /// Keys under which libvmaf reports this metric, in preference order.
    #[must_use]
    pub fn report_keys(self) -> &'static [&'static str] {
        match self {
            Self::Vmaf => &["vmaf"],
            Self::Ssim => &["float_ssim", "ssim"],
        }
    }

    /// Whether `value` lies inside the closed domain.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        let (lo, hi) = self.domain();
        value >= lo && value <= hi
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vmaf" => Ok(Self::Vmaf),
            "ssim" => Ok(Self::Ssim),
            other => Err(Error::UnknownMetric(other.to_string())),
        }
    }
}

/// Clamp a fitted value into the metric's domain and round it to
/// [`VALUE_DECIMALS`] digits, half away from zero.
///
/// Non-finite values clamp to the lower bound. Both steps are monotone, so a
/// non-decreasing input sequence stays non-decreasing.
///
/// # Example
///
/// ```
/// use vq_curves::curve::{Metric, clamp_round};
///
/// assert_eq!(clamp_round(101.2, Metric::Vmaf), 100.0);
/// assert_eq!(clamp_round(0.98765, Metric::Ssim), 0.988);
/// assert_eq!(clamp_round(-0.2, Metric::Ssim), 0.0);
/// ```
#[must_use]
pub fn clamp_round(value: f64, metric: Metric) -> f64 {
    let (lo, hi) = metric.domain();
    if !value.is_finite() {
        return lo;
    }
    let scale = 10f64.powi(VALUE_DECIMALS);
    let rounded = (value.clamp(lo, hi) * scale).round() / scale;
    rounded.clamp(lo, hi)
}
