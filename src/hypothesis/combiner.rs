//! Combination rules over the predictions of several models.
//!
//! Every function takes the distributions predicted by the members
//! for one instance.
//! For a numeric class each distribution has length `1`
//! and `NaN` means "no prediction".
use serde::{Serialize, Deserialize};

use std::fmt;
use std::str::FromStr;

use crate::{
    common::utils,
    error::{EnsembleError, Result},
};


/// How [`Vote`](crate::Vote) combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationRule {
    /// Elementwise mean of the distributions.
    #[default]
    Average,
    /// Elementwise product of the distributions. Nominal class only.
    Product,
    /// One vote per member for its most probable class(es).
    /// Nominal class only.
    MajorityVoting,
    /// Elementwise minimum.
    Min,
    /// Elementwise maximum.
    Max,
    /// Lower median of the predictions. Numeric class only.
    Median,
}


impl CombinationRule {
    /// Checks that `self` can combine predictions
    /// for a class of the given type.
    pub fn check_class(&self, class_is_numeric: bool) -> Result<()> {
        let ok = match self {
            Self::Product | Self::MajorityVoting => !class_is_numeric,
            Self::Median => class_is_numeric,
            Self::Average | Self::Min | Self::Max => true,
        };
        if !ok {
            let class = if class_is_numeric { "numeric" } else { "nominal" };
            return Err(EnsembleError::incompatible(
                "vote",
                format!("rule `{self}` cannot handle a {class} class"),
            ));
        }
        Ok(())
    }
}


impl fmt::Display for CombinationRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Average => "average",
            Self::Product => "product",
            Self::MajorityVoting => "majority_voting",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
        };
        write!(f, "{name}")
    }
}


impl FromStr for CombinationRule {
    type Err = EnsembleError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "average" | "avg" => Ok(Self::Average),
            "product" | "prod" => Ok(Self::Product),
            "majority_voting" | "majority" | "maj" => Ok(Self::MajorityVoting),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "median" | "med" => Ok(Self::Median),
            _ => Err(EnsembleError::invalid_parameter(
                "combination_rule", s, "unknown rule"
            )),
        }
    }
}


/// Combines `dists` under `rule`.
/// For a nominal class the result is normalized
/// unless it sums to zero, which signals "no prediction".
pub fn combine(
    rule: CombinationRule,
    dists: &[Vec<f64>],
    num_classes: usize,
    class_is_numeric: bool,
) -> Vec<f64>
{
    let mut result = match rule {
        CombinationRule::Average => average(dists, num_classes, class_is_numeric),
        CombinationRule::Product => product(dists, num_classes),
        CombinationRule::MajorityVoting => majority_voting(dists, num_classes),
        CombinationRule::Min => extremum(dists, num_classes, class_is_numeric, |a, b| a > b),
        CombinationRule::Max => extremum(dists, num_classes, class_is_numeric, |a, b| a < b),
        CombinationRule::Median => {
            let predictions = dists.iter()
                .filter_map(|d| d.first().copied())
                .collect::<Vec<_>>();
            let mut result = vec![0f64; num_classes.max(1)];
            result[0] = median(&predictions);
            result
        },
    };

    if !class_is_numeric && utils::sum(&result) > 0f64 {
        utils::normalize(&mut result);
    }
    result
}


// A numeric prediction counts only if it is not missing.
#[inline(always)]
fn counts(dist: &[f64], class_is_numeric: bool) -> bool {
    !class_is_numeric || dist.first().is_some_and(|v| !v.is_nan())
}


/// Elementwise mean.
/// For a numeric class, missing predictions are ignored
/// and the result is `NaN` if every prediction is missing.
pub fn average(dists: &[Vec<f64>], num_classes: usize, class_is_numeric: bool)
    -> Vec<f64>
{
    let mut probs = vec![0f64; num_classes];
    let mut n_predictions = 0usize;
    for dist in dists.iter().filter(|d| counts(d, class_is_numeric)) {
        probs.iter_mut()
            .zip(dist)
            .for_each(|(p, d)| { *p += d; });
        n_predictions += 1;
    }

    if class_is_numeric {
        if n_predictions == 0 {
            probs[0] = f64::NAN;
        } else {
            let n = n_predictions as f64;
            probs.iter_mut().for_each(|p| { *p /= n; });
        }
    } else {
        utils::normalize(&mut probs);
    }
    probs
}


/// Elementwise product.
/// Distributions that sum to zero are skipped.
/// Returns all zeros if every distribution was skipped.
pub fn product(dists: &[Vec<f64>], num_classes: usize) -> Vec<f64> {
    let mut probs = vec![1f64; num_classes];
    let mut n_predictions = 0usize;
    for dist in dists.iter().filter(|d| utils::sum(d) > 0f64) {
        probs.iter_mut()
            .zip(dist)
            .for_each(|(p, d)| { *p *= d; });
        n_predictions += 1;
    }

    if n_predictions == 0 {
        return vec![0f64; num_classes];
    }
    utils::normalize(&mut probs);
    probs
}


/// Majority voting.
///
/// Each distribution votes for every class
/// that attains its maximum, provided the maximum is positive.
/// If several classes receive the most votes,
/// the arg-max of [`average`] decides.
/// Returns a one-hot vector, or all zeros if nobody voted.
pub fn majority_voting(dists: &[Vec<f64>], num_classes: usize) -> Vec<f64> {
    let mut votes = vec![0f64; num_classes];
    for dist in dists {
        if dist.is_empty() {
            continue;
        }
        let k = utils::max_index(dist);
        let max = dist[k];
        if max > 0f64 {
            dist.iter()
                .zip(votes.iter_mut())
                .filter(|(p, _)| **p == max)
                .for_each(|(_, v)| { *v += 1f64; });
        }
    }

    let top = utils::max_index(&votes);
    if votes.is_empty() || votes[top] == 0f64 {
        return vec![0f64; num_classes];
    }

    let n_ties = votes.iter().filter(|v| **v == votes[top]).count();
    let winner = if n_ties > 1 {
        utils::max_index(&average(dists, num_classes, false))
    } else {
        top
    };

    let mut probs = vec![0f64; num_classes];
    probs[winner] = 1f64;
    probs
}


// Elementwise min or max.
// `replace(current, candidate)` tells whether `candidate` wins.
// The first contributing distribution initializes the result.
fn extremum<F>(
    dists: &[Vec<f64>],
    num_classes: usize,
    class_is_numeric: bool,
    replace: F,
) -> Vec<f64>
    where F: Fn(f64, f64) -> bool
{
    let mut probs = vec![0f64; num_classes];
    let mut n_predictions = 0usize;
    for dist in dists.iter().filter(|d| counts(d, class_is_numeric)) {
        probs.iter_mut()
            .zip(dist)
            .for_each(|(p, &d)| {
                if n_predictions == 0 || replace(*p, d) {
                    *p = d;
                }
            });
        n_predictions += 1;
    }

    if class_is_numeric && n_predictions == 0 {
        probs[0] = f64::NAN;
    }
    probs
}


/// Elementwise minimum. See [`combine`].
pub fn min(dists: &[Vec<f64>], num_classes: usize, class_is_numeric: bool)
    -> Vec<f64>
{
    extremum(dists, num_classes, class_is_numeric, |a, b| a > b)
}


/// Elementwise maximum. See [`combine`].
pub fn max(dists: &[Vec<f64>], num_classes: usize, class_is_numeric: bool)
    -> Vec<f64>
{
    extremum(dists, num_classes, class_is_numeric, |a, b| a < b)
}


/// The lower median of the non-missing predictions,
/// i.e., the `(n + 1) / 2`-th smallest of `n` values counting from one.
/// Returns `NaN` if every prediction is missing.
pub fn median(predictions: &[f64]) -> f64 {
    let values = predictions.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect::<Vec<_>>();
    match values.len() {
        0 => f64::NAN,
        n => utils::kth_smallest(&values, (n - 1) / 2).unwrap_or(f64::NAN),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn median_is_lower_median() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0]), 1.0);
        assert_eq!(median(&[3.0, f64::NAN, 1.0, 2.0]), 2.0);
        assert!(median(&[f64::NAN]).is_nan());
    }

    #[test]
    fn average_of_identical_is_fixed_point() {
        let dist = vec![0.2, 0.5, 0.3];
        let dists = vec![dist.clone(); 4];
        let avg = combine(CombinationRule::Average, &dists, 3, false);
        for (a, d) in avg.iter().zip(&dist) {
            assert_abs_diff_eq!(a, d, epsilon = 1e-15);
        }
    }

    #[test]
    fn product_skips_empty_distributions() {
        let dists = vec![vec![0.5, 0.5], vec![0.0, 0.0], vec![0.2, 0.8]];
        let p = product(&dists, 2);
        assert_abs_diff_eq!(p[0], 0.2);
        assert_abs_diff_eq!(p[1], 0.8);

        let none = product(&[vec![0.0, 0.0]], 2);
        assert_eq!(none, vec![0.0, 0.0]);
    }

    #[test]
    fn majority_breaks_ties_with_average() {
        let dists = vec![
            vec![0.6, 0.4],
            vec![0.1, 0.9],
        ];
        // One vote each: the average [0.35, 0.65] decides.
        assert_eq!(majority_voting(&dists, 2), vec![0.0, 1.0]);

        let dists = vec![vec![0.5, 0.5], vec![0.7, 0.3]];
        // The first model votes for both classes.
        assert_eq!(majority_voting(&dists, 2), vec![1.0, 0.0]);

        assert_eq!(majority_voting(&[vec![0.0, 0.0]], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn numeric_min_max_ignore_missing() {
        let dists = vec![vec![f64::NAN], vec![4.0], vec![-1.0]];
        assert_eq!(min(&dists, 1, true), vec![-1.0]);
        assert_eq!(max(&dists, 1, true), vec![4.0]);
        assert!(max(&[vec![f64::NAN]], 1, true)[0].is_nan());
        assert_eq!(average(&dists, 1, true), vec![1.5]);
    }

    #[test]
    fn rule_class_compatibility() {
        assert!(CombinationRule::Median.check_class(false).is_err());
        assert!(CombinationRule::Product.check_class(true).is_err());
        assert!(CombinationRule::Average.check_class(true).is_ok());
        assert_eq!("maj".parse::<CombinationRule>().unwrap(),
                   CombinationRule::MajorityVoting);
    }
}
