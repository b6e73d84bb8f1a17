use serde::{Serialize, Deserialize};

use std::fmt;

use crate::{
    Bagging,
    Instance,
    LearnerRegistry,
    Model,
    common::utils,
    error::{EnsembleError, Result},
    persist::{self, ModelRecord},
};
use super::OutOfBag;


/// The model trained by [`Bagging`].
///
/// For a nominal class the member distributions are summed and normalized.
/// For a numeric class the non-missing member predictions are averaged.
///
/// Models trained on different parts of the data can be merged:
/// call [`BaggingModel::aggregate`] once per partial model
/// and then [`BaggingModel::finalize_aggregation`].
#[derive(Debug)]
pub struct BaggingModel {
    base_learner: String,
    class_is_numeric: bool,
    num_classes: usize,
    models: Vec<Box<dyn Model>>,
    out_of_bag: Option<OutOfBag>,
    pending: Option<Vec<Box<dyn Model>>>,
}


impl BaggingModel {
    pub(super) fn new(
        base_learner: String,
        class_is_numeric: bool,
        num_classes: usize,
        models: Vec<Box<dyn Model>>,
        out_of_bag: Option<OutOfBag>,
    ) -> Self
    {
        Self {
            base_learner,
            class_is_numeric,
            num_classes,
            models,
            out_of_bag,
            pending: None,
        }
    }


    /// Registry identifier of the base learner.
    pub fn base_learner(&self) -> &str {
        &self.base_learner
    }


    /// The bagged models.
    pub fn models(&self) -> &[Box<dyn Model>] {
        &self.models[..]
    }


    /// Number of bagged models.
    pub fn num_iterations(&self) -> usize {
        self.models.len()
    }


    /// The out-of-bag estimate, if it was computed.
    pub fn out_of_bag(&self) -> Option<&OutOfBag> {
        self.out_of_bag.as_ref()
    }


    /// The out-of-bag error, or `NaN` if it was not computed.
    pub fn measure_out_of_bag_error(&self) -> f64 {
        self.out_of_bag.as_ref()
            .map(|oob| oob.error)
            .unwrap_or(f64::NAN)
    }


    /// Queues the models of `other` for merging into `self`.
    /// Both ensembles must bag the same base learner.
    pub fn aggregate(&mut self, other: BaggingModel) -> Result<&mut Self> {
        if self.base_learner != other.base_learner {
            return Err(EnsembleError::Aggregation {
                ours: self.base_learner.clone(),
                theirs: other.base_learner,
            });
        }
        if self.class_is_numeric != other.class_is_numeric
            || self.num_classes != other.num_classes
        {
            return Err(EnsembleError::SchemaMismatch {
                reason: "aggregated ensembles predict different classes".to_string(),
            });
        }
        let pending = self.pending.get_or_insert_with(Vec::new);
        pending.extend(other.models);
        Ok(self)
    }


    /// Appends the queued models to `self`.
    /// The out-of-bag estimate no longer describes the merged ensemble
    /// and is dropped.
    pub fn finalize_aggregation(&mut self) {
        let Some(pending) = self.pending.take() else { return; };
        if pending.is_empty() {
            return;
        }
        self.models.extend(pending);
        self.out_of_bag = None;
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: BaggingModelRepr
            = persist::decode_value(Bagging::NAME, value)?;
        let models = repr.models.into_iter()
            .map(|record| record.decode(registry))
            .collect::<Result<Vec<_>>>()?;
        let model = Self::new(
            repr.base_learner,
            repr.class_is_numeric,
            repr.num_classes,
            models,
            repr.out_of_bag,
        );
        Ok(Box::new(model))
    }
}


impl Model for BaggingModel {
    fn learner(&self) -> &str {
        Bagging::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        if self.class_is_numeric {
            let mut sum = 0f64;
            let mut count = 0usize;
            for model in self.models.iter() {
                let p = model.classify(instance)?;
                if !p.is_nan() {
                    sum += p;
                    count += 1;
                }
            }
            let mean = if count == 0 { f64::NAN } else { sum / count as f64 };
            return Ok(vec![mean]);
        }

        let mut sums = vec![0f64; self.num_classes];
        for model in self.models.iter() {
            let dist = model.distribution(instance)?;
            sums.iter_mut()
                .zip(dist)
                .for_each(|(s, p)| { *s += p; });
        }
        if !utils::eq(utils::sum(&sums), 0f64) {
            utils::normalize(&mut sums);
        }
        Ok(sums)
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let models = self.models.iter()
            .map(|model| ModelRecord::encode(model.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let repr = BaggingModelRepr {
            base_learner: self.base_learner.clone(),
            class_is_numeric: self.class_is_numeric,
            num_classes: self.num_classes,
            models,
            out_of_bag: self.out_of_bag.clone(),
        };
        Ok(serde_json::to_value(repr)?)
    }
}


impl fmt::Display for BaggingModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Bagging with {} iterations and base learner {}",
            self.models.len(), self.base_learner,
        )?;
        if let Some(oob) = self.out_of_bag.as_ref() {
            let measure = if self.class_is_numeric {
                "Mean absolute error"
            } else {
                "Error rate"
            };
            writeln!(f, "*** Out-of-bag estimates ***")?;
            writeln!(f, "{measure}: {:.4}", oob.error)?;
            writeln!(f, "Evaluated instances: {}", oob.num_evaluated)?;
        }
        Ok(())
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct BaggingModelRepr {
    base_learner: String,
    class_is_numeric: bool,
    num_classes: usize,
    models: Vec<ModelRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    out_of_bag: Option<OutOfBag>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZeroRModel;

    fn constant(counts: Vec<f64>) -> Box<dyn Model> {
        Box::new(ZeroRModel::Nominal { counts })
    }

    fn bagged(base: &str, models: Vec<Box<dyn Model>>) -> BaggingModel {
        BaggingModel::new(base.to_string(), false, 2, models, None)
    }

    #[test]
    fn aggregation_merges_models() {
        let mut ours = bagged("zero_r", vec![constant(vec![3.0, 1.0])]);
        let theirs = bagged("zero_r", vec![constant(vec![1.0, 3.0])]);
        ours.aggregate(theirs).unwrap();
        assert_eq!(ours.num_iterations(), 1);
        ours.finalize_aggregation();
        assert_eq!(ours.num_iterations(), 2);

        let dist = ours.distribution(&Instance::unlabeled(vec![])).unwrap();
        assert_eq!(dist, vec![0.5, 0.5]);
    }

    #[test]
    fn aggregation_needs_same_base_learner() {
        let mut ours = bagged("zero_r", vec![]);
        let theirs = bagged("decision_stump", vec![]);
        let err = ours.aggregate(theirs).unwrap_err();
        assert!(matches!(err, EnsembleError::Aggregation { .. }));
    }

    #[test]
    fn numeric_class_averages_predictions() {
        let models: Vec<Box<dyn Model>> = vec![
            Box::new(ZeroRModel::Numeric { sum: 4.0, sum_of_weights: 2.0 }),
            Box::new(ZeroRModel::Numeric { sum: 8.0, sum_of_weights: 2.0 }),
        ];
        let model = BaggingModel::new("zero_r".to_string(), true, 1, models, None);
        let dist = model.distribution(&Instance::unlabeled(vec![])).unwrap();
        assert_eq!(dist, vec![3.0]);
    }
}
