//! Provides [`ZeroR`], the constant predictor.
//!
//! `ZeroR` ignores every attribute.
//! For a nominal class it predicts the weighted class frequencies,
//! where each count starts at `1` (Laplace correction).
//! For a numeric class it predicts the weighted mean.
//!
//! Every iterative ensemble falls back to `ZeroR`
//! when the training data has no predictor attribute.
use serde::{Serialize, Deserialize};
use log::debug;

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


/// The constant learner.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZeroR;


impl ZeroR {
    /// Registry identifier.
    pub const NAME: &'static str = "zero_r";


    /// Construct a new instance of `ZeroR`.
    pub fn init() -> Self {
        Self
    }


    pub(crate) fn from_spec(_spec: &LearnerSpec, _registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        Ok(Box::new(Self::init()))
    }


    /// Trains the constant model on `data`.
    /// Instances with a missing class are skipped.
    pub fn train(&self, data: &Dataset) -> ZeroRModel {
        let schema = data.schema();
        let mut model = if schema.class_is_nominal() {
            ZeroRModel::Nominal { counts: vec![1f64; schema.num_classes()] }
        } else {
            ZeroRModel::Numeric { sum: 0f64, sum_of_weights: 0f64 }
        };

        data.iter()
            .filter(|instance| !instance.class_is_missing())
            .for_each(|instance| model.add(instance));

        debug!("{}: trained {model:?}", Self::NAME);
        model
    }
}


impl BaseLearner for ZeroR {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: false,
            incremental: true,
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


/// The model trained by [`ZeroR`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRModel {
    /// Laplace-corrected weighted class counts.
    Nominal {
        /// Weighted count per class.
        counts: Vec<f64>,
    },
    /// Weighted sum of the class values.
    Numeric {
        /// Weighted sum of class values.
        sum: f64,
        /// Sum of weights.
        sum_of_weights: f64,
    },
}


impl ZeroRModel {
    fn add(&mut self, instance: &Instance) {
        let w = instance.weight();
        match self {
            Self::Nominal { counts } => {
                let y = instance.class_value() as usize;
                if let Some(c) = counts.get_mut(y) {
                    *c += w;
                }
            },
            Self::Numeric { sum, sum_of_weights } => {
                *sum += w * instance.class_value();
                *sum_of_weights += w;
            },
        }
    }


    /// The constant prediction.
    pub fn prediction(&self) -> Vec<f64> {
        match self {
            Self::Nominal { counts } => {
                let mut dist = counts.clone();
                utils::normalize(&mut dist);
                dist
            },
            Self::Numeric { sum, sum_of_weights } => {
                let mean = if *sum_of_weights > 0f64 {
                    sum / sum_of_weights
                } else {
                    0f64
                };
                vec![mean]
            },
        }
    }
}


impl ZeroRModel {
    pub(crate) fn decode(value: serde_json::Value, _registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let model: Self = persist::decode_value(ZeroR::NAME, value)?;
        Ok(Box::new(model))
    }
}


impl Model for ZeroRModel {
    fn learner(&self) -> &str {
        ZeroR::NAME
    }


    fn distribution(&self, _instance: &Instance) -> Result<Vec<f64>> {
        Ok(self.prediction())
    }


    fn update(&mut self, instance: &Instance) -> Result<()> {
        if instance.class_is_missing() {
            return Ok(());
        }
        if let Self::Nominal { counts } = self {
            let y = instance.class_value();
            if y < 0f64 || y as usize >= counts.len() {
                return Err(EnsembleError::SchemaMismatch {
                    reason: format!("class value {y} is out of range"),
                });
            }
        }
        self.add(instance);
        Ok(())
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
