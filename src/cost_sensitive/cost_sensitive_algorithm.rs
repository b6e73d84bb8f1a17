//! Provides [`CostSensitiveClassifier`].
use serde::{Serialize, Deserialize};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use log::{debug, info};

use std::fs;
use std::path::PathBuf;

use crate::{
    BaseLearner,
    Capabilities,
    Dataset,
    DecisionStump,
    LearnerRegistry,
    LearnerSpec,
    Model,
    common::checker,
    constants::*,
    error::{EnsembleError, Result},
};
use super::{CostMatrix, CostSensitiveModel};


/// Where [`CostSensitiveClassifier`] gets its cost matrix from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatrixSource {
    /// A matrix given with the configuration.
    Supplied {
        /// The cost matrix.
        matrix: CostMatrix,
    },
    /// A file of `true-class predicted-class cost` triples,
    /// read when training starts.
    OldFormatFile {
        /// Path to the file.
        path: PathBuf,
    },
    /// The file `<relation>.cost` in `directory`,
    /// where `<relation>` is the relation name of the training data.
    OnDemand {
        /// Directory holding the cost files.
        directory: PathBuf,
    },
}


impl Default for MatrixSource {
    fn default() -> Self {
        Self::OnDemand { directory: PathBuf::from(".") }
    }
}


impl MatrixSource {
    /// Returns the cost matrix for `data`.
    pub fn resolve(&self, data: &Dataset) -> Result<CostMatrix> {
        match self {
            Self::Supplied { matrix } => Ok(matrix.clone()),
            Self::OldFormatFile { path } => {
                let text = fs::read_to_string(path)?;
                CostMatrix::parse_old_format(&text, data.num_classes())
            },
            Self::OnDemand { directory } => {
                let name = format!(
                    "{}.{COST_FILE_EXTENSION}",
                    data.schema().relation_name(),
                );
                let path = directory.join(name);
                if !path.exists() {
                    return Err(EnsembleError::MissingCostFile { path });
                }
                debug!("loading cost matrix from {}", path.display());
                CostMatrix::from_file(&path)
            },
        }
    }
}


/// Options of [`CostSensitiveClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostSensitiveOptions {
    /// Source of the cost matrix.
    pub matrix_source: MatrixSource,
    /// Predict the class of minimum expected cost
    /// instead of reweighting the training data.
    pub minimize_expected_cost: bool,
    /// Seed of the resampling used when the base learner
    /// does not handle instance weights.
    pub seed: u64,
}


impl Default for CostSensitiveOptions {
    fn default() -> Self {
        Self {
            matrix_source: MatrixSource::default(),
            minimize_expected_cost: false,
            seed: DEFAULT_SEED,
        }
    }
}


/// Makes its base learner cost-sensitive.
///
/// Two modes are available.
/// - By default the training data is reweighted by [`CostMatrix::apply`],
///   so that classes that are expensive to misclassify weigh more.
///   The data is resampled if the base learner ignores weights.
/// - With [`CostSensitiveOptions::minimize_expected_cost`],
///   training is untouched and every predicted distribution is replaced
///   by a one-hot vector at the class of minimum expected cost.
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(data: &Dataset) -> Result<()> {
/// let matrix = CostMatrix::parse_matlab("[0 1; 5 0]")?;
/// let classifier = CostSensitiveClassifier::default()
///     .cost_matrix(matrix)
///     .minimize_expected_cost(true);
/// let f = classifier.train(data)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CostSensitiveClassifier {
    options: CostSensitiveOptions,
    base: Box<dyn BaseLearner>,
}


impl CostSensitiveClassifier {
    /// Registry identifier.
    pub const NAME: &'static str = "cost_sensitive";


    /// Construct a new instance over `base`.
    pub fn init(base: Box<dyn BaseLearner>) -> Self {
        Self::with_options(CostSensitiveOptions::default(), base)
    }


    /// Construct a new instance from its options.
    pub fn with_options(
        options: CostSensitiveOptions,
        base: Box<dyn BaseLearner>,
    ) -> Self
    {
        Self { options, base }
    }


    /// Use `matrix` as the cost matrix.
    pub fn cost_matrix(mut self, matrix: CostMatrix) -> Self {
        self.options.matrix_source = MatrixSource::Supplied { matrix };
        self
    }


    /// Set the source of the cost matrix.
    pub fn matrix_source(mut self, source: MatrixSource) -> Self {
        self.options.matrix_source = source;
        self
    }


    /// Predict the class of minimum expected cost.
    pub fn minimize_expected_cost(mut self, flag: bool) -> Self {
        self.options.minimize_expected_cost = flag;
        self
    }


    /// Set the resampling seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }


    /// The options of `self`.
    pub fn options(&self) -> &CostSensitiveOptions {
        &self.options
    }


    /// Trains the base learner on `data`.
    pub fn train(&self, data: &Dataset) -> Result<CostSensitiveModel> {
        checker::check_nominal_class(Self::NAME, data)?;
        let base = self.base.as_ref();
        let capabilities = base.capabilities();
        capabilities.check_class(base.name(), data.schema())?;

        let data = data.delete_missing_class();
        checker::check_nonempty(&data)?;

        let matrix = self.options.matrix_source.resolve(&data)?;
        matrix.check_size(&data)?;

        let model = if self.options.minimize_expected_cost {
            base.fit(&data)?
        } else {
            let mut rng = (!capabilities.weighted_instances)
                .then(|| ChaCha8Rng::seed_from_u64(self.options.seed));
            if rng.is_some() {
                debug!(
                    "{}: {} ignores weights, resampling the training data",
                    Self::NAME, base.name(),
                );
            }
            let reweighted = matrix.apply(&data, rng.as_mut())?;
            base.fit(&reweighted)?
        };

        let mode = if self.options.minimize_expected_cost {
            "minimum expected cost"
        } else {
            "reweighting"
        };
        info!("{}: trained {} by {mode}", Self::NAME, base.name());
        Ok(CostSensitiveModel::new(
            model, matrix, self.options.minimize_expected_cost,
        ))
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<CostSensitiveOptions>()?;
        let base = registry.build_base(spec, Box::new(DecisionStump::init()))?;
        Ok(Box::new(Self::with_options(options, base)))
    }
}


impl Default for CostSensitiveClassifier {
    fn default() -> Self {
        Self::init(Box::new(DecisionStump::init()))
    }
}


impl BaseLearner for CostSensitiveClassifier {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let source = match &self.options.matrix_source {
            MatrixSource::Supplied { matrix } => matrix.to_matlab(),
            MatrixSource::OldFormatFile { path }
                => format!("file {}", path.display()),
            MatrixSource::OnDemand { directory }
                => format!("on demand from {}", directory.display()),
        };
        let info = Vec::from([
            ("Base learner", self.base.name().to_string()),
            ("Cost matrix", source),
            ("Minimize expected cost", format!("{}", self.options.minimize_expected_cost)),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: true,
            incremental: false,
            batch_prediction: self.base.capabilities().batch_prediction,
            nominal_class: true,
            numeric_class: false,
        }
    }


    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>> {
        Ok(Box::new(self.train(data)?))
    }


    fn fresh(&self) -> Box<dyn BaseLearner> {
        Box::new(self.clone())
    }


    fn reseeded(&self, seed: u64) -> Box<dyn BaseLearner> {
        Box::new(self.clone().seed(seed))
    }
}
