//! A string-keyed factory of learners and saved models.
use std::collections::HashMap;
use std::fmt;

use crate::{
    AdaBoostM1,
    AdditiveRegression,
    Bagging,
    BaseLearner,
    CostSensitiveClassifier,
    DecisionStump,
    LearnerSpec,
    LogitBoost,
    Model,
    Vote,
    ZeroR,
    booster::{AdaBoostM1Model, AdditiveRegressionModel, LogitBoostModel},
    bagging::BaggingModel,
    cost_sensitive::CostSensitiveModel,
    hypothesis::VoteModel,
    DecisionStumpModel,
    ZeroRModel,
    error::{EnsembleError, Result},
};


/// Builds a learner from its specification.
/// Nested specifications are resolved through the registry argument.
pub type LearnerConstructor
    = fn(&LearnerSpec, &LearnerRegistry) -> Result<Box<dyn BaseLearner>>;


/// Decodes a model encoded by [`Model::to_value`].
/// Nested models are decoded through the registry argument.
pub type ModelDecoder
    = fn(serde_json::Value, &LearnerRegistry) -> Result<Box<dyn Model>>;


/// Maps learner identifiers to constructors and model decoders.
///
/// [`LearnerRegistry::default`] knows every learner of this crate.
/// Register your own learners with
/// [`LearnerRegistry::register_learner`] and
/// [`LearnerRegistry::register_model`].
#[derive(Clone)]
pub struct LearnerRegistry {
    learners: HashMap<String, LearnerConstructor>,
    models: HashMap<String, ModelDecoder>,
}


impl LearnerRegistry {
    /// A registry without any entry.
    pub fn empty() -> Self {
        Self {
            learners: HashMap::new(),
            models: HashMap::new(),
        }
    }


    /// Registers the constructor of `id`.
    /// Returns the constructor previously registered under `id`, if any.
    pub fn register_learner<S: Into<String>>(
        &mut self,
        id: S,
        constructor: LearnerConstructor,
    ) -> Option<LearnerConstructor>
    {
        self.learners.insert(id.into(), constructor)
    }


    /// Registers the model decoder of `id`.
    /// Returns the decoder previously registered under `id`, if any.
    pub fn register_model<S: Into<String>>(
        &mut self,
        id: S,
        decoder: ModelDecoder,
    ) -> Option<ModelDecoder>
    {
        self.models.insert(id.into(), decoder)
    }


    /// Returns `true` if a constructor is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.learners.contains_key(id)
    }


    /// Registered learner identifiers in ascending order.
    pub fn learner_ids(&self) -> Vec<&str> {
        let mut ids = self.learners.keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }


    /// Builds the learner described by `spec`.
    pub fn build(&self, spec: &LearnerSpec) -> Result<Box<dyn BaseLearner>> {
        let constructor = self.learners.get(&spec.learner)
            .ok_or_else(|| EnsembleError::UnknownLearner {
                id: spec.learner.clone(),
            })?;
        constructor(spec, self)
    }


    /// Builds the base learner of `spec`,
    /// or `default` if `spec` names none.
    pub fn build_base(
        &self,
        spec: &LearnerSpec,
        default: Box<dyn BaseLearner>,
    ) -> Result<Box<dyn BaseLearner>>
    {
        match spec.base.as_deref() {
            Some(base) => self.build(base),
            None => Ok(default),
        }
    }


    /// Decodes a model of learner `id`.
    pub fn decode_model(&self, id: &str, value: serde_json::Value)
        -> Result<Box<dyn Model>>
    {
        let decoder = self.models.get(id)
            .ok_or_else(|| EnsembleError::UnknownLearner {
                id: id.to_string(),
            })?;
        decoder(value, self)
    }
}


impl Default for LearnerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_learner(ZeroR::NAME, ZeroR::from_spec);
        registry.register_model(ZeroR::NAME, ZeroRModel::decode);

        registry.register_learner(DecisionStump::NAME, DecisionStump::from_spec);
        registry.register_model(DecisionStump::NAME, DecisionStumpModel::decode);

        registry.register_learner(AdaBoostM1::NAME, AdaBoostM1::from_spec);
        registry.register_model(AdaBoostM1::NAME, AdaBoostM1Model::decode);

        registry.register_learner(LogitBoost::NAME, LogitBoost::from_spec);
        registry.register_model(LogitBoost::NAME, LogitBoostModel::decode);

        registry.register_learner(
            AdditiveRegression::NAME,
            AdditiveRegression::from_spec,
        );
        registry.register_model(
            AdditiveRegression::NAME,
            AdditiveRegressionModel::decode,
        );

        registry.register_learner(Bagging::NAME, Bagging::from_spec);
        registry.register_model(Bagging::NAME, BaggingModel::decode);

        registry.register_learner(Vote::NAME, Vote::from_spec);
        registry.register_model(Vote::NAME, VoteModel::decode);

        registry.register_learner(
            CostSensitiveClassifier::NAME,
            CostSensitiveClassifier::from_spec,
        );
        registry.register_model(
            CostSensitiveClassifier::NAME,
            CostSensitiveModel::decode,
        );

        registry
    }
}


impl fmt::Debug for LearnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LearnerRegistry")
            .field("learners", &self.learner_ids())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_every_learner() {
        let registry = LearnerRegistry::default();
        let ids = [
            "adaboost_m1", "additive_regression", "bagging",
            "cost_sensitive", "decision_stump", "logit_boost",
            "vote", "zero_r",
        ];
        assert_eq!(registry.learner_ids(), ids);
    }

    #[test]
    fn unknown_learner_is_an_error() {
        let registry = LearnerRegistry::default();
        let spec = LearnerSpec::new("random_forest");
        let err = registry.build(&spec).unwrap_err();
        assert!(matches!(err, EnsembleError::UnknownLearner { id } if id == "random_forest"));
    }

    #[test]
    fn nested_spec_resolves_base() {
        let registry = LearnerRegistry::default();
        let spec = LearnerSpec::new("bagging")
            .options(serde_json::json!({ "num_iterations": 3 }))
            .base(LearnerSpec::new("zero_r"));
        let learner = registry.build(&spec).unwrap();
        assert_eq!(learner.name(), "bagging");
        let info = learner.info().unwrap();
        assert!(info.iter().any(|(k, v)| *k == "Base learner" && v == "zero_r"));
    }
}
