//! Checked numeric conversions shared by grid math and statistics.

use num_traits::cast::cast;

/// Index of the step-aligned interval containing `value`.
///
/// Returns `None` when the quotient is not representable (NaN input or a
/// magnitude outside `i64`).
#[must_use]
pub fn floor_index(value: f64, step: f64) -> Option<i64> {
    if !value.is_finite() || !step.is_finite() || step <= 0.0 {
        return None;
    }
    cast((value / step).floor())
}

/// Smallest step-aligned index at or above `value / step`.
#[must_use]
pub fn ceil_index(value: f64, step: f64) -> Option<i64> {
    if !value.is_finite() || !step.is_finite() || step <= 0.0 {
        return None;
    }
    cast((value / step).ceil())
}

/// Lossless `usize` count to `f64`, refusing counts beyond 2^53.
#[must_use]
pub fn count_to_f64(count: usize) -> Option<f64> {
    let value: f64 = cast(count)?;
    if value > 9_007_199_254_740_992.0 {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_index_matches_floor_division() {
        assert_eq!(floor_index(130.153654, 0.0904432), Some(1439));
        assert_eq!(floor_index(74.890752, 0.0904432), Some(828));
        assert_eq!(floor_index(-0.5, 1.0), Some(-1));
        assert_eq!(floor_index(0.0, 1.0), Some(0));
    }

    #[test]
    fn ceil_index_rounds_up() {
        assert_eq!(ceil_index(0.1, 1.0), Some(1));
        assert_eq!(ceil_index(2.0, 1.0), Some(2));
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(floor_index(f64::NAN, 1.0), None);
        assert_eq!(floor_index(1.0, 0.0), None);
        assert_eq!(floor_index(1.0, -0.5), None);
        assert_eq!(ceil_index(f64::INFINITY, 1.0), None);
    }

    #[test]
    fn count_conversion_is_exact_for_small_counts() {
        assert_eq!(count_to_f64(25), Some(25.0));
        assert_eq!(count_to_f64(0), Some(0.0));
    }
}
