//! Provides the decision stump class.
//!
//! A decision stump is a depth-one tree.
//! It splits on a single attribute at a threshold `b`
//! and routes instances to one of three leaves:
//! `x <= b`, `x > b`, or "`x` is missing".
//! Nominal attributes are split on their label index.
//!
//! For a nominal class the split minimizes the weighted entropy
//! of the leaves and each leaf predicts its class frequencies.
//! For a numeric class the split minimizes the weighted squared error
//! and each leaf predicts its weighted mean.
use serde::{Serialize, Deserialize};
use log::trace;

use crate::{
    BaseLearner,
    Capabilities,
    Dataset,
    Instance,
    LearnerRegistry,
    LearnerSpec,
    Model,
    common::utils,
    persist,
    error::{EnsembleError, Result},
};


/// The struct `DecisionStump` produces a [`DecisionStumpModel`]
/// for each call of [`BaseLearner::fit`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecisionStump;


impl DecisionStump {
    /// Registry identifier.
    pub const NAME: &'static str = "decision_stump";


    /// Construct a new instance of `DecisionStump`.
    pub fn init() -> Self {
        Self
    }


    pub(crate) fn from_spec(_spec: &LearnerSpec, _registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        Ok(Box::new(Self::init()))
    }


    /// Trains a stump on `data`.
    pub fn train(&self, data: &Dataset) -> DecisionStumpModel {
        let nominal = data.schema().class_is_nominal();
        let stats = Stats::zeros(nominal, data.num_classes());

        let labeled = data.iter()
            .filter(|instance| !instance.class_is_missing())
            .collect::<Vec<_>>();

        let mut all = stats.clone();
        labeled.iter()
            .for_each(|instance| all.add(instance.class_value(), instance.weight()));
        let default_leaf = all.leaf(None);

        let mut best: Option<Candidate> = None;
        for j in 0..data.num_attributes() {
            let candidate = best_split_on(&labeled, j, &stats);
            let Some(candidate) = candidate else { continue; };

            let better = best.as_ref()
                .map(|b| candidate.impurity < b.impurity)
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        }

        match best {
            Some(c) => {
                trace!(
                    "{}: split on attribute {} at {} (impurity {})",
                    Self::NAME, c.attribute, c.threshold, c.impurity,
                );
                DecisionStumpModel {
                    split: Some(Split {
                        attribute: c.attribute,
                        threshold: c.threshold,
                    }),
                    left: c.left.leaf(Some(&default_leaf)),
                    right: c.right.leaf(Some(&default_leaf)),
                    missing: c.missing.leaf(Some(&default_leaf)),
                }
            },
            None => DecisionStumpModel {
                split: None,
                left: default_leaf.clone(),
                right: default_leaf.clone(),
                missing: default_leaf,
            },
        }
    }
}


impl BaseLearner for DecisionStump {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: false,
            incremental: false,
            batch_prediction: false,
            nominal_class: true,
            numeric_class: true,
        }
    }


    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>> {
        Ok(Box::new(self.train(data)))
    }


    fn fresh(&self) -> Box<dyn BaseLearner> {
        Box::new(*self)
    }
}


// Sufficient statistics of a leaf.
// Nominal class: weight per class.
// Numeric class: `[sum w, sum w*y, sum w*y^2]`.
#[derive(Debug, Clone)]
struct Stats {
    nominal: bool,
    sums: Vec<f64>,
}


impl Stats {
    fn zeros(nominal: bool, n_classes: usize) -> Self {
        let len = if nominal { n_classes } else { 3 };
        Self { nominal, sums: vec![0f64; len] }
    }


    fn add(&mut self, y: f64, w: f64) {
        self.accumulate(y, w);
    }


    fn sub(&mut self, y: f64, w: f64) {
        self.accumulate(y, -w);
    }


    #[inline(always)]
    fn accumulate(&mut self, y: f64, w: f64) {
        if self.nominal {
            if let Some(s) = self.sums.get_mut(y as usize) {
                *s += w;
            }
        } else {
            self.sums[0] += w;
            self.sums[1] += w * y;
            self.sums[2] += w * y * y;
        }
    }


    fn total_weight(&self) -> f64 {
        if self.nominal { utils::sum(&self.sums) } else { self.sums[0] }
    }


    // Weighted entropy (nominal) or weighted squared error (numeric).
    fn impurity(&self) -> f64 {
        let total = self.total_weight();
        if total <= 0f64 {
            return 0f64;
        }
        if self.nominal {
            let xlnx = |x: f64| if x > 0f64 { x * x.ln() } else { 0f64 };
            xlnx(total) - self.sums.iter().map(|&c| xlnx(c)).sum::<f64>()
        } else {
            (self.sums[2] - self.sums[1] * self.sums[1] / total).max(0f64)
        }
    }


    fn leaf(&self, fallback: Option<&[f64]>) -> Vec<f64> {
        let total = self.total_weight();
        if total <= 0f64 {
            return match fallback {
                Some(leaf) => leaf.to_vec(),
                None if self.nominal => {
                    let k = self.sums.len();
                    vec![1f64 / k as f64; k]
                },
                None => vec![0f64],
            };
        }
        if self.nominal {
            let mut dist = self.sums.clone();
            utils::normalize_by(&mut dist, total);
            dist
        } else {
            vec![self.sums[1] / total]
        }
    }
}


struct Candidate {
    attribute: usize,
    threshold: f64,
    impurity: f64,
    left: Stats,
    right: Stats,
    missing: Stats,
}


// Finds the best threshold on attribute `j`.
// Returns `None` if `j` takes less than two distinct values.
fn best_split_on(
    labeled: &[&Instance],
    j: usize,
    zeros: &Stats,
) -> Option<Candidate>
{
    let mut missing = zeros.clone();
    let mut right = zeros.clone();
    let mut pairs = Vec::with_capacity(labeled.len());
    for instance in labeled {
        let (x, y, w) = (
            instance.value(j), instance.class_value(), instance.weight()
        );
        if x.is_nan() {
            missing.add(y, w);
        } else {
            right.add(y, w);
            pairs.push((x, y, w));
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let missing_impurity = missing.impurity();
    let mut left = zeros.clone();
    let mut best: Option<Candidate> = None;
    for i in 0..pairs.len().saturating_sub(1) {
        let (x, y, w) = pairs[i];
        left.add(y, w);
        right.sub(y, w);

        let next = pairs[i + 1].0;
        if x == next {
            continue;
        }

        let impurity = left.impurity() + right.impurity() + missing_impurity;
        let better = best.as_ref()
            .map(|b| impurity < b.impurity)
            .unwrap_or(true);
        if better {
            best = Some(Candidate {
                attribute: j,
                threshold: (x + next) / 2f64,
                impurity,
                left: left.clone(),
                right: right.clone(),
                missing: missing.clone(),
            });
        }
    }
    best
}


/// The split of a [`DecisionStumpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Index of the attribute the stump splits on.
    pub attribute: usize,
    /// Instances with `x[attribute] <= threshold` go left.
    pub threshold: f64,
}


/// The model trained by [`DecisionStump`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStumpModel {
    /// The split, or `None` if the stump is a single leaf.
    pub split: Option<Split>,
    /// Prediction for `x <= threshold`.
    pub left: Vec<f64>,
    /// Prediction for `x > threshold`.
    pub right: Vec<f64>,
    /// Prediction for a missing `x`.
    pub missing: Vec<f64>,
}


impl DecisionStumpModel {
    pub(crate) fn decode(value: serde_json::Value, _registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let model: Self = persist::decode_value(DecisionStump::NAME, value)?;
        Ok(Box::new(model))
    }
}


impl Model for DecisionStumpModel {
    fn learner(&self) -> &str {
        DecisionStump::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        let Some(split) = self.split else {
            return Ok(self.left.clone());
        };

        let x = instance.values()
            .get(split.attribute)
            .copied()
            .ok_or_else(|| EnsembleError::SchemaMismatch {
                reason: format!(
                    "instance has no attribute {}", split.attribute
                ),
            })?;

        let leaf = if x.is_nan() {
            &self.missing
        } else if x <= split.threshold {
            &self.left
        } else {
            &self.right
        };
        Ok(leaf.clone())
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Schema};
    use approx::assert_abs_diff_eq;

    fn nominal_data() -> Dataset {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("noise"), Attribute::numeric("x")],
            Attribute::nominal("y", ["neg", "pos"]),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![0.0, 1.0], 0.0),
            Instance::new(vec![1.0, 2.0], 0.0),
            Instance::new(vec![0.0, 3.0], 1.0),
            Instance::new(vec![1.0, 4.0], 1.0),
        ];
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn splits_on_informative_attribute() {
        let data = nominal_data();
        let model = DecisionStump::init().train(&data);

        let split = model.split.unwrap();
        assert_eq!(split.attribute, 1);
        assert_abs_diff_eq!(split.threshold, 2.5);
        assert_eq!(model.left, vec![1.0, 0.0]);
        assert_eq!(model.right, vec![0.0, 1.0]);

        for instance in data.iter() {
            let y = model.classify(instance).unwrap();
            assert_eq!(y, instance.class_value());
        }
    }

    #[test]
    fn missing_value_goes_to_missing_leaf() {
        let data = nominal_data();
        let model = DecisionStump::init().train(&data);
        let dist = model.distribution(&Instance::unlabeled(vec![0.0, f64::NAN]))
            .unwrap();
        // No training instance was missing: overall frequencies.
        assert_eq!(dist, vec![0.5, 0.5]);
    }

    #[test]
    fn regression_leaves_are_means() {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::numeric("y"),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![1.0], 1.0),
            Instance::new(vec![2.0], 3.0),
            Instance::new(vec![3.0], 10.0),
            Instance::new(vec![4.0], 12.0),
        ];
        let data = Dataset::from_instances(schema, instances).unwrap();
        let model = DecisionStump::init().train(&data);

        assert_abs_diff_eq!(model.left[0], 2.0);
        assert_abs_diff_eq!(model.right[0], 11.0);
        let y = model.classify(&Instance::unlabeled(vec![3.5])).unwrap();
        assert_abs_diff_eq!(y, 11.0);
    }

    #[test]
    fn constant_attribute_gives_single_leaf() {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::numeric("y"),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![1.0], 1.0),
            Instance::new(vec![1.0], 3.0),
        ];
        let data = Dataset::from_instances(schema, instances).unwrap();
        let model = DecisionStump::init().train(&data);
        assert!(model.split.is_none());
        assert_abs_diff_eq!(model.left[0], 2.0);
    }
}
