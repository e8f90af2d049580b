//! Center statistics and descriptive summaries.
//!
//! Measurement sources routinely contain `NaN` or infinite values (failed
//! frames, empty CSV cells parsed as `inf`). Every function here filters
//! non-finite inputs first, so callers can hand over raw columns.
//!
//! - [`median`], [`mean`]: center statistics used by the aggregator
//! - [`Summary`]: descriptive statistics (used by `inspect`)

use serde::{Deserialize, Serialize};

/// Descriptive statistics for a set of measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of finite values.
    pub count: usize,
    /// Mean value.
    pub mean: f64,
    /// Median value.
    pub median: f64,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// 5th percentile.
    pub p5: f64,
    /// 95th percentile.
    pub p95: f64,
}

impl Summary {
    /// Compute summary statistics for a slice of values.
    ///
    /// Returns `None` if the slice holds no finite value.
    #[must_use]
    pub fn compute(values: &[f64]) -> Option<Self> {
        let sorted = sorted_finite(values);
        if sorted.is_empty() {
            return None;
        }

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        Some(Self {
            count,
            mean,
            median: percentile_sorted(&sorted, 0.5),
            min: sorted[0],
            max: sorted[count - 1],
            p5: percentile_sorted(&sorted, 0.05),
            p95: percentile_sorted(&sorted, 0.95),
        })
    }
}

/// Compute the median of the finite values in a slice.
///
/// For an even count, returns the average of the two middle values.
///
/// # Example
///
/// ```
/// use vq_curves::stats::median;
///
/// assert_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
/// assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
/// assert_eq!(median(&[f64::NAN]), None);
/// ```
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compute the arithmetic mean of the finite values in a slice.
///
/// # Example
///
/// ```
/// use vq_curves::stats::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, f64::INFINITY, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile (0.0-1.0) of pre-sorted values, R-7 interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let frac = idx - lower as f64;

    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_compute() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let summary = Summary::compute(&values).unwrap();

        assert_eq!(summary.count, 5);
        assert!((summary.mean - 3.0).abs() < 0.001);
        assert!((summary.median - 3.0).abs() < 0.001);
        assert!((summary.min - 1.0).abs() < 0.001);
        assert!((summary.max - 5.0).abs() < 0.001);
        assert!((summary.p95 - 4.8).abs() < 0.001);
    }

    #[test]
    fn test_summary_empty() {
        assert!(Summary::compute(&[]).is_none());
        assert!(Summary::compute(&[f64::NAN, f64::NEG_INFINITY]).is_none());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_median_ignores_non_finite() {
        assert_eq!(median(&[f64::NAN, 1.0, 2.0, f64::INFINITY, 3.0]), Some(2.0));
    }

    #[test]
    fn test_mean_ignores_non_finite() {
        let m = mean(&[10.0, f64::NAN, 20.0]).unwrap();
        assert!((m - 15.0).abs() < 1e-12);
        assert_eq!(mean(&[f64::NAN]), None);
    }
}
