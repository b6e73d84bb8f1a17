use serde::{Serialize, Deserialize};

use std::fmt;

use crate::{
    AdaBoostM1,
    Instance,
    LearnerRegistry,
    Model,
    WeightedMajority,
    ZeroRModel,
    hypothesis::WeightedMajorityRepr,
    error::{EnsembleError, Result},
    persist,
};


/// The model trained by [`AdaBoostM1`].
///
/// With a single model the prediction is that model's distribution.
/// Otherwise every model votes for its predicted class with weight `beta`
/// and the vote totals are mapped to probabilities by `logs2probs`.
#[derive(Debug)]
pub struct AdaBoostM1Model {
    num_classes: usize,
    ensemble: WeightedMajority,
    fallback: Option<ZeroRModel>,
}


impl AdaBoostM1Model {
    pub(crate) fn new(
        num_classes: usize,
        ensemble: WeightedMajority,
        fallback: Option<ZeroRModel>,
    ) -> Self
    {
        Self { num_classes, ensemble, fallback }
    }


    /// Weights of the boosted models.
    pub fn betas(&self) -> &[f64] {
        &self.ensemble.weights[..]
    }


    /// The boosted models.
    pub fn models(&self) -> &[Box<dyn Model>] {
        &self.ensemble.hypotheses[..]
    }


    /// Number of rounds kept.
    pub fn num_iterations_performed(&self) -> usize {
        self.ensemble.len()
    }


    /// Returns `true` if the model is the constant fallback
    /// for data without predictor attributes.
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }


    /// Drops every model after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.ensemble.truncate(len);
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: AdaBoostM1ModelRepr
            = persist::decode_value(AdaBoostM1::NAME, value)?;
        let model = Self {
            num_classes: repr.num_classes,
            ensemble: WeightedMajority::from_repr(repr.ensemble, registry)?,
            fallback: repr.fallback,
        };
        Ok(Box::new(model))
    }
}


impl Model for AdaBoostM1Model {
    fn learner(&self) -> &str {
        AdaBoostM1::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        if let Some(fallback) = self.fallback.as_ref() {
            return fallback.distribution(instance);
        }
        match self.ensemble.len() {
            0 => Err(EnsembleError::State {
                learner: AdaBoostM1::NAME.to_string(),
                reason: "no model built".to_string(),
            }),
            1 => self.ensemble.hypotheses[0].distribution(instance),
            _ => self.ensemble.vote(instance, self.num_classes),
        }
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let repr = AdaBoostM1ModelRepr {
            num_classes: self.num_classes,
            ensemble: self.ensemble.to_repr()?,
            fallback: self.fallback.clone(),
        };
        Ok(serde_json::to_value(repr)?)
    }
}


impl fmt::Display for AdaBoostM1Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(fallback) = self.fallback.as_ref() {
            writeln!(f, "AdaBoostM1: no predictor attributes, constant model")?;
            return writeln!(f, "{:?}", fallback.prediction());
        }
        writeln!(f, "AdaBoostM1: base models and their weights")?;
        let pairs = self.ensemble.hypotheses.iter()
            .zip(&self.ensemble.weights[..])
            .enumerate();
        for (t, (h, beta)) in pairs {
            writeln!(f, "  [{:>3}] {:<20} weight: {:.4}", t + 1, h.learner(), beta)?;
        }
        writeln!(f, "Number of performed iterations: {}", self.ensemble.len())
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct AdaBoostM1ModelRepr {
    num_classes: usize,
    ensemble: WeightedMajorityRepr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback: Option<ZeroRModel>,
}
