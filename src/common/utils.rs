//! This file provides the numeric helpers shared by every ensemble,
//! such as normalization of distributions and `logs2probs`.
use crate::constants::SMALL;


/// Returns `true` if `a` and `b` differ by less than [`SMALL`].
#[inline(always)]
pub fn eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < SMALL
}


/// Returns `true` if `a` is greater than or equal to `b`
/// up to [`SMALL`].
#[inline(always)]
pub fn gr_or_eq(a: f64, b: f64) -> bool {
    b - a < SMALL || a >= b
}


/// Sum of the slice.
#[inline(always)]
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum::<f64>()
}


/// Normalizes `values` so that it sums to `1`.
/// A vector that sums to `0` (or to a non-finite value) is left as is.
#[inline(always)]
pub fn normalize(values: &mut [f64]) {
    let total = sum(values);
    normalize_by(values, total);
}


/// Divides every entry of `values` by `total`.
/// Does nothing if `total` is zero or not finite.
#[inline(always)]
pub fn normalize_by(values: &mut [f64], total: f64) {
    if total == 0f64 || !total.is_finite() {
        return;
    }
    values.iter_mut()
        .for_each(|v| { *v /= total; });
}


/// Index of the first maximal element.
/// Returns `0` for an empty slice.
pub fn max_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}


/// Index of the first minimal element.
/// Returns `0` for an empty slice.
pub fn min_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v < values[best] {
            best = i;
        }
    }
    best
}


/// Converts an array of log-scores into a probability vector.
/// The maximum is subtracted before exponentiation,
/// so that large scores do not overflow.
pub fn logs2probs(logs: &[f64]) -> Vec<f64> {
    let max = logs.iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let mut probs = logs.iter()
        .map(|a| (a - max).exp())
        .collect::<Vec<_>>();
    normalize(&mut probs);
    probs
}


/// Returns the predicted class index for a class distribution,
/// or `NaN` if the distribution assigns zero mass to every class.
pub fn predicted_class(dist: &[f64]) -> f64 {
    if dist.is_empty() {
        return f64::NAN;
    }
    let k = max_index(dist);
    if dist[k] == 0f64 { f64::NAN } else { k as f64 }
}


/// Returns the `k`-th smallest (zero-based) value of `values`.
/// The order statistic is exact, no interpolation takes place.
/// Returns `None` if `k` is out of range.
pub fn kth_smallest(values: &[f64], k: usize) -> Option<f64> {
    if k >= values.len() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[k])
}


/// Returns the indices of `values` sorted in ascending order.
/// Ties keep their original order.
pub fn sort_indices(values: &[f64]) -> Vec<usize> {
    let mut indices = (0..values.len()).collect::<Vec<usize>>();
    indices.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
    indices
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_logs2probs_01() {
        let probs = logs2probs(&[0.0, 0.0]);
        assert_abs_diff_eq!(probs[0], 0.5);
        assert_abs_diff_eq!(probs[1], 0.5);
    }

    #[test]
    fn test_logs2probs_large_scores() {
        let probs = logs2probs(&[1000.0, 1000.0 + 2f64.ln()]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_abs_diff_eq!(probs[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[1], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_sum() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_kth_smallest() {
        let v = [3.0, 1.0, 2.0];
        assert_eq!(kth_smallest(&v, 1), Some(2.0));
        assert_eq!(kth_smallest(&v, 3), None);
    }

    #[test]
    fn test_max_index_first_of_ties() {
        assert_eq!(max_index(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(min_index(&[0.5, 0.1, 0.1]), 1);
    }

    #[test]
    fn test_predicted_class_all_zero() {
        assert!(predicted_class(&[0.0, 0.0]).is_nan());
        assert_eq!(predicted_class(&[0.1, 0.9]), 1.0);
    }
}
