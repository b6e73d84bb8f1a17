//! Provides the [`BaseLearner`] and [`Model`] traits.
use serde::{Serialize, Deserialize};
use rayon::prelude::*;

use std::fmt;

use crate::{
    Dataset,
    Instance,
    Schema,
    common::utils,
    error::{EnsembleError, Result},
};


/// Optional abilities of a learner.
///
/// The descriptor is queried once, when an ensemble is set up,
/// instead of at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// The learner honors instance weights.
    /// Ensembles resample when this is `false`.
    pub weighted_instances: bool,
    /// The learner has a seed that ensembles can set per round.
    pub randomizable: bool,
    /// Trained models accept [`Model::update`].
    pub incremental: bool,
    /// Trained models override [`Model::distributions`].
    pub batch_prediction: bool,
    /// The learner handles a nominal class.
    pub nominal_class: bool,
    /// The learner handles a numeric class.
    pub numeric_class: bool,
}


impl Capabilities {
    /// Checks that a learner named `learner` can handle
    /// the class type of `schema`.
    pub fn check_class(&self, learner: &str, schema: &Schema) -> Result<()> {
        if schema.class_is_nominal() && !self.nominal_class {
            return Err(EnsembleError::incompatible(
                learner, "cannot handle a nominal class"
            ));
        }
        if schema.class_is_numeric() && !self.numeric_class {
            return Err(EnsembleError::incompatible(
                learner, "cannot handle a numeric class"
            ));
        }
        Ok(())
    }
}


/// A model-fitting algorithm.
///
/// Implementors are configurations: calling [`BaseLearner::fit`]
/// never mutates `self`,
/// so one learner can be shared by many rounds and threads.
///
/// # Required Methods
/// - [`BaseLearner::name`]
/// - [`BaseLearner::capabilities`]
/// - [`BaseLearner::fit`]
/// - [`BaseLearner::fresh`]
///
/// # Provided Methods
/// - [`BaseLearner::info`]
/// - [`BaseLearner::reseeded`]
pub trait BaseLearner: Send + Sync + fmt::Debug {
    /// Registry identifier of the learner, e.g., `"decision_stump"`.
    fn name(&self) -> &str;


    /// Returns the hyperparameters of the learner as `String`.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// The capability descriptor of the learner.
    fn capabilities(&self) -> Capabilities;


    /// Trains a model on `data`.
    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>>;


    /// Returns an untrained learner with the same hyperparameters.
    fn fresh(&self) -> Box<dyn BaseLearner>;


    /// Returns an untrained learner with the same hyperparameters
    /// whose random seed is `seed`.
    /// Learners that are not randomizable return [`BaseLearner::fresh`].
    fn reseeded(&self, seed: u64) -> Box<dyn BaseLearner> {
        let _ = seed;
        self.fresh()
    }
}


impl Clone for Box<dyn BaseLearner> {
    fn clone(&self) -> Self {
        self.fresh()
    }
}


/// A trained model.
///
/// For a nominal class, [`Model::distribution`] returns
/// one probability per class.
/// For a numeric class it returns a single value,
/// where `NaN` means "no prediction".
pub trait Model: Send + Sync + fmt::Debug {
    /// Registry identifier of the learner that produced `self`.
    fn learner(&self) -> &str;


    /// Predicts the class distribution of `instance`.
    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>>;


    /// Predicts the class of `instance`.
    /// For a nominal class this is the index of the most probable class,
    /// or `NaN` if every class has zero probability.
    /// For a numeric class this is the predicted value.
    fn classify(&self, instance: &Instance) -> Result<f64> {
        let dist = self.distribution(instance)?;
        let prediction = match dist.len() {
            0 => f64::NAN,
            1 => dist[0],
            _ => utils::predicted_class(&dist),
        };
        Ok(prediction)
    }


    /// Predicts the distributions of every instance in `data`.
    fn distributions(&self, data: &Dataset) -> Result<Vec<Vec<f64>>> {
        data.instances()
            .par_iter()
            .map(|instance| self.distribution(instance))
            .collect()
    }


    /// Updates `self` with one more training instance.
    fn update(&mut self, instance: &Instance) -> Result<()> {
        let _ = instance;
        Err(EnsembleError::Unsupported {
            learner: self.learner().to_string(),
            capability: "incremental update".to_string(),
        })
    }


    /// Encodes `self` as a JSON value.
    /// The value is decoded by the registry entry of [`Model::learner`].
    fn to_value(&self) -> Result<serde_json::Value>;
}
