//! Weighted isotonic regression by pool-adjacent-violators.
//!
//! Given points sorted ascending by bitrate, [`fit`] returns the weighted
//! least-squares closest sequence that is non-decreasing in value. Blocks are
//! kept on a stack; whenever the top two blocks are out of order they are
//! pooled into one whose value is their weighted average. Pooling only moves
//! value between points, so `Σ weight·value` is conserved.

use super::{FittedPoint, WeightedPoint};

#[derive(Debug, Clone, Copy)]
struct Block {
    weight: f64,
    value: f64,
    /// Number of consecutive input points covered.
    len: usize,
}

impl Block {
    fn pool(self, next: Block) -> Block {
        let weight = self.weight + next.weight;
        let value = if weight > 0.0 {
            (self.weight * self.value + next.weight * next.value) / weight
        } else {
            (self.value + next.value) / 2.0
        };
        Block {
            weight,
            value,
            len: self.len + next.len,
        }
    }
}

/// Fit a non-decreasing sequence to `points`.
///
/// The output has one point per input point, with the same bitrate and
/// weight. `points` must be sorted ascending by bitrate.
///
/// # Example
///
/// ```
/// use vq_curves::curve::{WeightedPoint, isotonic};
///
/// let input = [
///     WeightedPoint::new(1000.0, 40.0, 1.0),
///     WeightedPoint::new(2000.0, 35.0, 1.0),
///     WeightedPoint::new(3000.0, 50.0, 1.0),
/// ];
/// let fitted = isotonic::fit(&input);
/// let values: Vec<f64> = fitted.iter().map(|p| p.value).collect();
/// assert_eq!(values, vec![37.5, 37.5, 50.0]);
/// ```
#[must_use]
pub fn fit(points: &[WeightedPoint]) -> Vec<FittedPoint> {
    debug_assert!(
        points
            .windows(2)
            .all(|w| w[0].bitrate_kbps <= w[1].bitrate_kbps),
        "isotonic::fit requires input sorted by bitrate"
    );

    let mut stack: Vec<Block> = Vec::with_capacity(points.len());
    for p in points {
        stack.push(Block {
            weight: p.weight,
            value: p.value,
            len: 1,
        });
        while stack.len() >= 2 {
            let last = stack[stack.len() - 1];
            let prev = stack[stack.len() - 2];
            if prev.value <= last.value {
                break;
            }
            stack.truncate(stack.len() - 2);
            stack.push(prev.pool(last));
        }
    }

    let mut fitted = Vec::with_capacity(points.len());
    let mut source = points.iter();
    for block in &stack {
        for p in source.by_ref().take(block.len) {
            fitted.push(FittedPoint::new(p.bitrate_kbps, block.value, p.weight));
        }
    }
    fitted
}

/// Whether values are non-decreasing.
#[must_use]
pub fn is_monotone(points: &[WeightedPoint]) -> bool {
    points.windows(2).all(|w| w[0].value <= w[1].value)
}
