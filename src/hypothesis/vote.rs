//! Provides [`Vote`], an ensemble of independently trained models
//! combined by a [`CombinationRule`].
use serde::{Serialize, Deserialize};
use rayon::prelude::*;
use log::{info, warn};

use std::path::PathBuf;
use std::sync::Arc;

use super::combiner::{self, CombinationRule};
use crate::{
    BaseLearner,
    Capabilities,
    Dataset,
    Instance,
    LearnerRegistry,
    LearnerSpec,
    Model,
    ZeroR,
    common::checker,
    error::{EnsembleError, Result},
    persist::{self, ModelRecord, SavedModel},
};


/// Options of [`Vote`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoteOptions {
    /// How the member predictions are combined.
    pub combination_rule: CombinationRule,
    /// Saved-model files loaded as pre-built members.
    pub model_files: Vec<PathBuf>,
}


/// An ensemble of independently trained members.
///
/// Members come from three sources:
/// - learners in [`Vote::members`], trained on the training data,
/// - saved-model files in [`VoteOptions::model_files`],
/// - models added with [`Vote::pre_built`].
///
/// A pre-built model whose file records a schema
/// must agree with the schema of the training data.
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(data: &Dataset) -> Result<()> {
/// let vote = Vote::init(vec![
///         Box::new(DecisionStump::init()),
///         Box::new(ZeroR::init()),
///     ])
///     .combination_rule(CombinationRule::MajorityVoting);
/// let model = vote.train(data)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Vote {
    options: VoteOptions,
    members: Vec<Box<dyn BaseLearner>>,
    pre_built: Vec<Arc<dyn Model>>,
    registry: Arc<LearnerRegistry>,
}


impl Vote {
    /// Registry identifier.
    pub const NAME: &'static str = "vote";


    /// Construct a new instance of `Vote` over `members`.
    pub fn init(members: Vec<Box<dyn BaseLearner>>) -> Self {
        Self {
            options: VoteOptions::default(),
            members,
            pre_built: Vec::new(),
            registry: Arc::new(LearnerRegistry::default()),
        }
    }


    /// Construct a `Vote` from its options.
    pub fn with_options(
        options: VoteOptions,
        members: Vec<Box<dyn BaseLearner>>,
    ) -> Self
    {
        Self { options, ..Self::init(members) }
    }


    /// Set the combination rule.
    pub fn combination_rule(mut self, rule: CombinationRule) -> Self {
        self.options.combination_rule = rule;
        self
    }


    /// Append a saved-model file to load at training time.
    pub fn model_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.model_files.push(path.into());
        self
    }


    /// Append a trained model as a pre-built member.
    pub fn pre_built(mut self, model: Box<dyn Model>) -> Self {
        self.pre_built.push(Arc::from(model));
        self
    }


    /// Set the registry that decodes the saved-model files.
    pub fn registry(mut self, registry: Arc<LearnerRegistry>) -> Self {
        self.registry = registry;
        self
    }


    /// The options of `self`.
    pub fn options(&self) -> &VoteOptions {
        &self.options
    }


    /// The learners trained by `self`.
    pub fn members(&self) -> &[Box<dyn BaseLearner>] {
        &self.members[..]
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<VoteOptions>()?;
        let members = spec.members.iter()
            .map(|member| registry.build(member))
            .collect::<Result<Vec<_>>>()?;
        let vote = Self::with_options(options, members)
            .registry(Arc::new(registry.clone()));
        Ok(Box::new(vote))
    }


    /// Trains every member on `data` and combines them
    /// with the pre-built models.
    pub fn train(&self, data: &Dataset) -> Result<VoteModel> {
        let schema = data.schema();
        let rule = self.options.combination_rule;
        rule.check_class(schema.class_is_numeric())?;

        let n_members = self.members.len()
            + self.pre_built.len()
            + self.options.model_files.len();
        if n_members == 0 {
            return Err(EnsembleError::invalid_parameter(
                "members", 0, "vote needs at least one member"
            ));
        }

        let data = data.delete_missing_class();

        let mut models = self.pre_built.clone();
        for path in self.options.model_files.iter() {
            let saved = SavedModel::load(path)?;
            match saved.schema.as_ref() {
                Some(trained_on) => {
                    trained_on.check_compatible(schema)
                        .map_err(|e| EnsembleError::SchemaMismatch {
                            reason: format!("{}: {e}", path.display()),
                        })?;
                },
                None => {
                    warn!(
                        "{}: {} records no schema, \
                        compatibility with the training data is not checked",
                        Self::NAME, path.display(),
                    );
                },
            }
            let (model, _) = saved.into_model(&self.registry)?;
            models.push(Arc::from(model));
        }

        if !self.members.is_empty() {
            checker::check_nonempty(&data)?;
            for member in self.members.iter() {
                member.capabilities().check_class(member.name(), schema)?;
            }
            let trained = self.members.par_iter()
                .map(|member| member.fit(&data))
                .collect::<Result<Vec<_>>>()?;
            models.extend(trained.into_iter().map(Arc::from));
        }

        info!(
            "{}: {} members combined by `{rule}`",
            Self::NAME, models.len(),
        );
        Ok(VoteModel {
            rule,
            num_classes: schema.num_classes(),
            class_is_numeric: schema.class_is_numeric(),
            models,
        })
    }
}


impl Default for Vote {
    fn default() -> Self {
        Self::init(vec![Box::new(ZeroR::init())])
    }
}


impl BaseLearner for Vote {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let members = self.members.iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ");
        let info = Vec::from([
            ("Combination rule", self.options.combination_rule.to_string()),
            ("Members", format!("[{members}]")),
            ("# Pre-built", format!("{}", self.pre_built.len() + self.options.model_files.len())),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        let nominal_class = !matches!(
            self.options.combination_rule,
            CombinationRule::Median
        );
        let numeric_class = !matches!(
            self.options.combination_rule,
            CombinationRule::Product | CombinationRule::MajorityVoting
        );
        Capabilities {
            weighted_instances: self.members.iter()
                .all(|m| m.capabilities().weighted_instances),
            randomizable: false,
            incremental: false,
            batch_prediction: false,
            nominal_class,
            numeric_class,
        }
    }


    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>> {
        Ok(Box::new(self.train(data)?))
    }


    fn fresh(&self) -> Box<dyn BaseLearner> {
        Box::new(self.clone())
    }
}


/// The model trained by [`Vote`].
#[derive(Debug, Clone)]
pub struct VoteModel {
    rule: CombinationRule,
    num_classes: usize,
    class_is_numeric: bool,
    models: Vec<Arc<dyn Model>>,
}


impl VoteModel {
    /// The combination rule.
    pub fn rule(&self) -> CombinationRule {
        self.rule
    }


    /// The members.
    pub fn models(&self) -> &[Arc<dyn Model>] {
        &self.models[..]
    }


    /// Number of members.
    pub fn num_models(&self) -> usize {
        self.models.len()
    }


    /// Adds `model` as one more member.
    pub fn aggregate(&mut self, model: Box<dyn Model>) {
        self.models.push(Arc::from(model));
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: VoteModelRepr = persist::decode_value(Vote::NAME, value)?;
        let models = repr.models.into_iter()
            .map(|record| record.decode(registry).map(Arc::from))
            .collect::<Result<Vec<_>>>()?;
        let model = Self {
            rule: repr.rule,
            num_classes: repr.num_classes,
            class_is_numeric: repr.class_is_numeric,
            models,
        };
        Ok(Box::new(model))
    }
}


impl Model for VoteModel {
    fn learner(&self) -> &str {
        Vote::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        let dists = self.models.iter()
            .map(|model| model.distribution(instance))
            .collect::<Result<Vec<_>>>()?;
        let dist = combiner::combine(
            self.rule,
            &dists,
            self.num_classes,
            self.class_is_numeric,
        );
        Ok(dist)
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let models = self.models.iter()
            .map(|model| ModelRecord::encode(model.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let repr = VoteModelRepr {
            rule: self.rule,
            num_classes: self.num_classes,
            class_is_numeric: self.class_is_numeric,
            models,
        };
        Ok(serde_json::to_value(repr)?)
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct VoteModelRepr {
    rule: CombinationRule,
    num_classes: usize,
    class_is_numeric: bool,
    models: Vec<ModelRecord>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, DecisionStump, Schema, ZeroRModel, persist::save_model};

    fn toy() -> Dataset {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![1.0], 0.0),
            Instance::new(vec![2.0], 0.0),
            Instance::new(vec![3.0], 1.0),
            Instance::new(vec![4.0], 1.0),
        ];
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn vote_without_members_is_rejected() {
        let vote = Vote::init(Vec::new());
        let err = vote.train(&toy()).unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidParameter { .. }));
    }

    #[test]
    fn median_rejects_nominal_class() {
        let vote = Vote::default().combination_rule(CombinationRule::Median);
        let err = vote.train(&toy()).unwrap_err();
        assert!(matches!(err, EnsembleError::IncompatibleData { .. }));
    }

    #[test]
    fn pre_built_only_vote_needs_no_training() {
        let model = ZeroRModel::Nominal { counts: vec![1.0, 3.0] };
        let vote = Vote::init(Vec::new()).pre_built(Box::new(model));
        let trained = vote.train(&toy()).unwrap();
        let x = Instance::unlabeled(vec![0.0]);
        assert_eq!(trained.classify(&x).unwrap(), 1.0);
    }

    #[test]
    fn pre_built_file_with_other_schema_is_fatal() {
        let other = Schema::new(
            "other",
            vec![Attribute::numeric("x"), Attribute::numeric("z")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero_r.json");
        let model = ZeroRModel::Nominal { counts: vec![1.0, 1.0] };
        save_model(&path, &model, Some(&other)).unwrap();

        let vote = Vote::default().model_file(&path);
        let err = vote.train(&toy()).unwrap_err();
        assert!(matches!(err, EnsembleError::SchemaMismatch { .. }));
    }

    #[test]
    fn aggregate_adds_a_member() {
        let vote = Vote::init(vec![Box::new(DecisionStump::init())]);
        let mut model = vote.train(&toy()).unwrap();
        assert_eq!(model.num_models(), 1);
        model.aggregate(Box::new(ZeroRModel::Nominal { counts: vec![1.0, 1.0] }));
        assert_eq!(model.num_models(), 2);
    }
}
