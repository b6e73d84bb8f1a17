use serde::{Serialize, Deserialize};

use std::fmt;

use crate::{
    AdditiveRegression,
    Instance,
    LearnerRegistry,
    Model,
    error::{EnsembleError, Result},
    persist::{self, ModelRecord},
};


/// The model trained by [`AdditiveRegression`].
///
/// Predicts `initial + shrinkage * (f_1(x) + ... + f_T(x))`.
/// If the training data had no predictor attributes,
/// the model predicts the constant `initial`.
#[derive(Debug)]
pub struct AdditiveRegressionModel {
    initial_prediction: f64,
    shrinkage: f64,
    models: Vec<Box<dyn Model>>,
    suitable: bool,
}


impl AdditiveRegressionModel {
    pub(crate) fn new(
        initial_prediction: f64,
        shrinkage: f64,
        models: Vec<Box<dyn Model>>,
        suitable: bool,
    ) -> Self
    {
        Self { initial_prediction, shrinkage, models, suitable }
    }


    /// The constant the additive model starts from.
    pub fn initial_prediction(&self) -> f64 {
        self.initial_prediction
    }


    /// The fitted residual models.
    pub fn models(&self) -> &[Box<dyn Model>] {
        &self.models[..]
    }


    /// Number of rounds performed.
    pub fn measure_num_iterations(&self) -> usize {
        self.models.len()
    }


    /// Returns the value of the named measure.
    /// The only measure is `"measureNumIterations"`.
    pub fn measure(&self, name: &str) -> Option<f64> {
        match name {
            "measureNumIterations" => Some(self.measure_num_iterations() as f64),
            _ => None,
        }
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: AdditiveRegressionModelRepr
            = persist::decode_value(AdditiveRegression::NAME, value)?;
        let models = repr.models.into_iter()
            .map(|record| record.decode(registry))
            .collect::<Result<Vec<_>>>()?;
        let model = Self::new(
            repr.initial_prediction, repr.shrinkage, models, repr.suitable,
        );
        Ok(Box::new(model))
    }
}


impl Model for AdditiveRegressionModel {
    fn learner(&self) -> &str {
        AdditiveRegression::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        let mut prediction = self.initial_prediction;
        if !self.suitable {
            return Ok(vec![prediction]);
        }
        for model in self.models.iter() {
            let p = model.classify(instance)?;
            if p.is_nan() {
                return Err(EnsembleError::unassigned(AdditiveRegression::NAME));
            }
            prediction += self.shrinkage * p;
        }
        Ok(vec![prediction])
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let models = self.models.iter()
            .map(|model| ModelRecord::encode(model.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let repr = AdditiveRegressionModelRepr {
            initial_prediction: self.initial_prediction,
            shrinkage: self.shrinkage,
            suitable: self.suitable,
            models,
        };
        Ok(serde_json::to_value(repr)?)
    }
}


impl fmt::Display for AdditiveRegressionModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Additive Regression")?;
        writeln!(f, "Initial prediction: {}", self.initial_prediction)?;
        if !self.suitable {
            return writeln!(f, "No predictor attributes, constant model");
        }
        writeln!(f, "Shrinkage: {}", self.shrinkage)?;
        for (t, model) in self.models.iter().enumerate() {
            writeln!(f, "  [{:>3}] {}", t + 1, model.learner())?;
        }
        writeln!(f, "Number of iterations: {}", self.models.len())
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct AdditiveRegressionModelRepr {
    initial_prediction: f64,
    shrinkage: f64,
    suitable: bool,
    models: Vec<ModelRecord>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecisionStumpModel, Split};

    #[test]
    fn missing_residual_prediction_is_unassigned() {
        let stump = DecisionStumpModel {
            split: Some(Split { attribute: 0, threshold: 0.0 }),
            left: vec![-1.0],
            right: vec![1.0],
            missing: vec![f64::NAN],
        };
        let model = AdditiveRegressionModel::new(2.0, 0.5, vec![Box::new(stump)], true);
        assert_eq!(model.classify(&Instance::unlabeled(vec![3.0])).unwrap(), 2.5);
        let err = model.classify(&Instance::unlabeled(vec![f64::NAN])).unwrap_err();
        assert!(matches!(err, EnsembleError::UnassignedClass { .. }));
        assert_eq!(model.measure("measureNumIterations"), Some(1.0));
    }
}
