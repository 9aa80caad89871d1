//! Order-statistic percentiles over call durations.

/// Sort durations ascending, NaN-safe.
pub fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

/// Value at quantile `p` (0.0..=1.0) of an ascending slice.
///
/// Uses the `floor(n * p)` order statistic clamped to the last index, so a
/// single sample is its own p50, p95 and p99. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let index = (sorted.len() as f64 * p).floor() as usize;
    sorted[index.min(last)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(percentile(&[], 0.95), 0.0);
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(percentile(&[42.0], 0.95), 42.0);
        assert_eq!(percentile(&[42.0], 0.99), 42.0);
    }

    #[test]
    fn test_floor_index_is_clamped() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        // floor(10 * 0.95) = 9 -> last element
        assert_eq!(percentile(&values, 0.95), 10.0);
        // floor(10 * 0.5) = 5 -> sixth element
        assert_eq!(percentile(&values, 0.5), 6.0);
        assert_eq!(percentile(&values, 1.0), 10.0);
    }

    #[test]
    fn test_sorted_orders_ascending() {
        assert_eq!(sorted(vec![3.0, 1.0, 2.0]), vec![1.0, 2.0, 3.0]);
    }
}
