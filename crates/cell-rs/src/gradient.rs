//! Linear parameter gradients along a section.

use crate::section::Section;
use ndarray::Array1;

/// Anything whose segments can take per-segment parameter values
pub trait RangeTarget {
    /// Normalized position of each segment
    fn positions(&self) -> Array1<f64>;

    /// Set `var` on the segment with the given index
    fn assign(&mut self, var: &str, index: usize, value: f64);
}

impl RangeTarget for Section {
    fn positions(&self) -> Array1<f64> {
        self.segment_positions()
    }

    fn assign(&mut self, var: &str, index: usize, value: f64) {
        self.set_param_index(var, index, value);
    }
}

/// `start + x * (stop - start)`, unclamped
pub fn linear_gradient(x: f64, start: f64, stop: f64) -> f64 {
    start + x * (stop - start)
}

/// Linearly assign values between `start` and `stop` to `var` on every segment.
///
/// Interpolation runs over normalized position, so physical length and
/// curvature play no part.
pub fn range_assignment<T: RangeTarget + ?Sized>(target: &mut T, var: &str, start: f64, stop: f64) {
    let values = target.positions().mapv(|x| linear_gradient(x, start, stop));
    for (index, value) in values.iter().enumerate() {
        target.assign(var, index, *value);
    }
}
