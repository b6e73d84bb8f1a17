//! Provides [`LogitBoost`] by Friedman, Hastie & Tibshirani, 2000.
use serde::{Serialize, Deserialize};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use log::{debug, info, warn};

use crate::{
    BaseLearner,
    Booster,
    Capabilities,
    Dataset,
    DecisionStump,
    LearnerRegistry,
    LearnerSpec,
    Model,
    ZeroR,
    ZeroRModel,
    booster::core::{DriverState, check_can_step, check_can_finalize},
    common::{checker, utils},
    constants::*,
    error::{EnsembleError, Result},
};
use super::logit_boost_model::{LogitBoostModel, add_round_scores};

use std::ops::ControlFlow;


const PSEUDO_CLASS: &str = "pseudo class";


/// Options of [`LogitBoost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogitBoostOptions {
    /// Maximal number of boosting rounds.
    pub num_iterations: usize,
    /// Seed of the random generator used for resampling.
    pub seed: u64,
    /// Percentage of the weight mass each round trains on.
    pub weight_threshold: u32,
    /// Train on weighted resamples instead of reweighted instances.
    /// Forced on if the base learner ignores instance weights.
    pub use_resampling: bool,
    /// Factor applied to every base model prediction.
    pub shrinkage: f64,
    /// Boosting stops once the average log-likelihood
    /// improves by less than this.
    pub likelihood_threshold: f64,
    /// Bound on the absolute working response.
    pub z_max: f64,
    /// Number of threads of the batch scorer.
    pub pool_size: usize,
    /// Number of round slices the batch scorer splits the work into.
    pub num_threads: usize,
    /// Smoothing of the 0/1 pseudo targets:
    /// the true class gets `1 - offset`, the others `offset / K`.
    pub offset: f64,
}


impl Default for LogitBoostOptions {
    fn default() -> Self {
        Self {
            num_iterations: DEFAULT_NUM_ITERATIONS,
            seed: DEFAULT_SEED,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            use_resampling: false,
            shrinkage: DEFAULT_SHRINKAGE,
            likelihood_threshold: DEFAULT_LIKELIHOOD_THRESHOLD,
            z_max: DEFAULT_Z_MAX,
            pool_size: DEFAULT_POOL_SIZE,
            num_threads: DEFAULT_NUM_THREADS,
            offset: 0f64,
        }
    }
}


impl LogitBoostOptions {
    /// Checks every option.
    pub fn validate(&self) -> Result<()> {
        checker::check_at_least_one("num_iterations", self.num_iterations)?;
        checker::check_percentage("weight_threshold", self.weight_threshold)?;
        checker::check_positive("shrinkage", self.shrinkage)?;
        checker::check_positive("z_max", self.z_max)?;
        checker::check_at_least_one("pool_size", self.pool_size)?;
        checker::check_at_least_one("num_threads", self.num_threads)?;

        if !(0f64..1f64).contains(&self.offset) {
            return Err(EnsembleError::invalid_parameter(
                "offset", self.offset, "must be in [0, 1)"
            ));
        }
        if self.use_resampling && self.weight_threshold < 100 {
            return Err(EnsembleError::invalid_parameter(
                "weight_threshold",
                self.weight_threshold,
                "weight pruning and resampling cannot be combined",
            ));
        }
        Ok(())
    }
}


/// Defines `LogitBoost`.
///
/// `LogitBoost` fits an additive logistic model.
/// Each round and each class `j` fits a regression base learner
/// to the working response `z` with weights `(y - p) / z`,
/// where `p` is the current probability of class `j`.
/// For two classes only class `0` is modeled
/// and the score of class `1` is its negation.
///
/// Boosting stops after [`LogitBoostOptions::num_iterations`] rounds
/// or once the average log-likelihood improves
/// by less than [`LogitBoostOptions::likelihood_threshold`].
///
/// The trained [`LogitBoostModel`] scores batches in parallel,
/// see [`Model::distributions`].
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(train: &Dataset, test: &Dataset) -> Result<()> {
/// let booster = LogitBoost::default()
///     .num_iterations(100)
///     .shrinkage(0.5)
///     .likelihood_threshold(1e-4)
///     .pool_size(4)
///     .num_threads(4);
///
/// let f = booster.train(train)?;
/// let dists = f.distributions(test)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LogitBoost {
    options: LogitBoostOptions,
    base: Box<dyn BaseLearner>,
}


impl LogitBoost {
    /// Registry identifier.
    pub const NAME: &'static str = "logit_boost";


    /// Construct a new instance of `LogitBoost`
    /// over the regression learner `base`.
    pub fn init(base: Box<dyn BaseLearner>) -> Self {
        Self::with_options(LogitBoostOptions::default(), base)
    }


    /// Construct a new instance of `LogitBoost` from its options.
    pub fn with_options(
        options: LogitBoostOptions,
        base: Box<dyn BaseLearner>,
    ) -> Self
    {
        Self { options, base }
    }


    /// Set the maximal number of rounds.
    pub fn num_iterations(mut self, num_iterations: usize) -> Self {
        self.options.num_iterations = num_iterations;
        self
    }


    /// Set the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }


    /// Set the weight threshold, in percent.
    pub fn weight_threshold(mut self, weight_threshold: u32) -> Self {
        self.options.weight_threshold = weight_threshold;
        self
    }


    /// Turn resampling on or off.
    pub fn use_resampling(mut self, use_resampling: bool) -> Self {
        self.options.use_resampling = use_resampling;
        self
    }


    /// Set the shrinkage.
    pub fn shrinkage(mut self, shrinkage: f64) -> Self {
        self.options.shrinkage = shrinkage;
        self
    }


    /// Set the likelihood threshold.
    pub fn likelihood_threshold(mut self, threshold: f64) -> Self {
        self.options.likelihood_threshold = threshold;
        self
    }


    /// Set the bound on the working response.
    pub fn z_max(mut self, z_max: f64) -> Self {
        self.options.z_max = z_max;
        self
    }


    /// Set the number of threads of the batch scorer.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.options.pool_size = pool_size;
        self
    }


    /// Set the number of round slices of the batch scorer.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.options.num_threads = num_threads;
        self
    }


    /// Set the target offset.
    pub fn offset(mut self, offset: f64) -> Self {
        self.options.offset = offset;
        self
    }


    /// The options of `self`.
    pub fn options(&self) -> &LogitBoostOptions {
        &self.options
    }


    /// Returns a driver that boosts round by round.
    pub fn driver(&self) -> LogitBoostDriver<'_> {
        LogitBoostDriver::new(self)
    }


    /// Runs every round on `data` and returns the boosted model.
    pub fn train(&self, data: &Dataset) -> Result<LogitBoostModel> {
        self.driver().run(data)
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<LogitBoostOptions>()?;
        options.validate()?;
        let base = registry.build_base(spec, Box::new(DecisionStump::init()))?;
        Ok(Box::new(Self::with_options(options, base)))
    }
}


impl Default for LogitBoost {
    fn default() -> Self {
        Self::init(Box::new(DecisionStump::init()))
    }
}


impl BaseLearner for LogitBoost {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let o = &self.options;
        let info = Vec::from([
            ("Base learner", self.base.name().to_string()),
            ("# Iterations", format!("{}", o.num_iterations)),
            ("Shrinkage", format!("{}", o.shrinkage)),
            ("Likelihood threshold", format!("{}", o.likelihood_threshold)),
            ("Z max", format!("{}", o.z_max)),
            ("Weight threshold", format!("{}", o.weight_threshold)),
            ("Resampling", format!("{}", o.use_resampling)),
            ("Pool size", format!("{}", o.pool_size)),
            ("# Threads", format!("{}", o.num_threads)),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: true,
            incremental: false,
            batch_prediction: true,
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


/// Runs [`LogitBoost`] round by round.
///
/// The pseudo targets, scores and probabilities
/// are owned by the driver and dropped by [`Booster::finalize`].
pub struct LogitBoostDriver<'a> {
    config: &'a LogitBoost,
    state: DriverState,

    data: Option<Dataset>,
    // Instance weights of the training data.
    weights: Vec<f64>,
    sum_of_weights: f64,

    // `ys[i][j]`: pseudo target of instance `i` for class `j`.
    ys: Vec<Vec<f64>>,
    // Additive scores.
    fs: Vec<Vec<f64>>,
    // Probabilities derived from `fs`.
    probs: Vec<Vec<f64>>,

    resampling: bool,
    rng: ChaCha8Rng,
    num_classes: usize,

    rounds: Vec<Vec<Box<dyn Model>>>,
    fallback: Option<ZeroRModel>,
    log_likelihood: f64,
}


impl<'a> LogitBoostDriver<'a> {
    fn new(config: &'a LogitBoost) -> Self {
        Self {
            config,
            state: DriverState::Uninitialized,
            data: None,
            weights: Vec::new(),
            sum_of_weights: 0f64,
            ys: Vec::new(),
            fs: Vec::new(),
            probs: Vec::new(),
            resampling: false,
            rng: ChaCha8Rng::seed_from_u64(config.options.seed),
            num_classes: 0,
            rounds: Vec::new(),
            fallback: None,
            log_likelihood: f64::NAN,
        }
    }


    /// Number of rounds performed so far.
    pub fn num_iterations_performed(&self) -> usize {
        self.rounds.len()
    }


    /// Average negative log-likelihood of the training data.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }


    // One round: a regression model per modeled class,
    // then the scores and probabilities are updated.
    fn perform_iteration(&mut self, data: &Dataset, round: usize)
        -> Result<()>
    {
        let config = self.config;
        let options = &config.options;
        let k = self.num_classes;

        let mut models = Vec::with_capacity(k);
        for j in 0..k {
            let (targets, mut weights): (Vec<f64>, Vec<f64>) = self.probs.iter()
                .zip(&self.ys)
                .zip(&self.weights)
                .map(|((p, y), w)| {
                    let (z, w_j) = working_response(p[j], y[j], options);
                    (z, w * w_j)
                })
                .unzip();

            let sum = utils::sum(&weights);
            if sum > 0f64 {
                let scale = self.sum_of_weights / sum;
                weights.iter_mut().for_each(|w| { *w *= scale; });
            }

            let boost_data = data.with_numeric_class(PSEUDO_CLASS, &targets, &weights)?;
            let train_data = if options.weight_threshold < 100 {
                let quantile = options.weight_threshold as f64 / 100f64;
                let selected = boost_data.select_weight_quantile(quantile);
                debug!(
                    "{}: round {round}, class {j} trains on {} of {} instances",
                    LogitBoost::NAME, selected.len(), boost_data.len(),
                );
                selected
            } else if self.resampling {
                boost_data.resample_with_weights(&mut self.rng, &weights)?
            } else {
                boost_data
            };

            let model = config.base.fit(&train_data)
                .map_err(|e| e.in_round(round))?;
            models.push(model);

            if k == 2 {
                break;
            }
        }

        // Scores change only once every instance has been scored.
        let shrinkage = options.shrinkage;
        let scores = data.instances()
            .par_iter()
            .zip(self.fs.par_iter())
            .map(|(instance, f)| -> Result<(Vec<f64>, Vec<f64>)> {
                let mut f = f.clone();
                add_round_scores(&models, shrinkage, k, instance, &mut f)?;
                let p = utils::logs2probs(&f);
                Ok((f, p))
            })
            .collect::<Result<Vec<_>>>()?;

        (self.fs, self.probs) = scores.into_iter().unzip();
        self.rounds.push(models);
        Ok(())
    }


    // Scores and probabilities keep the values of the last completed round.
    fn fail(&mut self) {
        self.data = None;
        self.rounds.clear();
        self.state = DriverState::Failed;
    }
}


// Working response `z` and its weight for one instance and class.
// `p` is the current probability, `y` the pseudo target.
fn working_response(p: f64, y: f64, options: &LogitBoostOptions)
    -> (f64, f64)
{
    let z = if y == 1f64 - options.offset {
        (1f64 / p).min(options.z_max)
    } else {
        (-1f64 / (1f64 - p)).max(-options.z_max)
    };
    (z, (y - p) / z)
}


// Average negative log-likelihood.
fn log_likelihood(ys: &[Vec<f64>], probs: &[Vec<f64>], offset: f64) -> f64 {
    let n = ys.len();
    if n == 0 {
        return 0f64;
    }
    let total = ys.iter()
        .zip(probs)
        .map(|(y, p)| {
            y.iter()
                .zip(p)
                .filter(|(yj, _)| **yj == 1f64 - offset)
                .map(|(_, pj)| -pj.ln())
                .sum::<f64>()
        })
        .sum::<f64>();
    total / n as f64
}


impl Booster for LogitBoostDriver<'_> {
    type Output = LogitBoostModel;


    fn name(&self) -> &str {
        "LogitBoost"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let mut info = self.config.info()?;
        if let Some(data) = self.data.as_ref() {
            info.insert(0, ("# of examples", format!("{}", data.len())));
            info.insert(1, ("# of features", format!("{}", data.num_attributes())));
        }
        Some(info)
    }


    fn state(&self) -> DriverState {
        self.state
    }


    fn objective(&self) -> Option<f64> {
        if self.log_likelihood.is_nan() {
            None
        } else {
            Some(self.log_likelihood)
        }
    }


    fn initialize(&mut self, data: &Dataset) -> Result<()> {
        let config = self.config;
        let options = &config.options;
        options.validate()?;

        checker::check_nominal_class(LogitBoost::NAME, data)?;
        let base = config.base.as_ref();
        let pseudo_schema = data.schema().with_numeric_class(PSEUDO_CLASS);
        base.capabilities().check_class(base.name(), &pseudo_schema)?;

        let data = data.delete_missing_class();
        checker::check_nonempty(&data)?;

        self.resampling = options.use_resampling
            || !base.capabilities().weighted_instances;
        self.rng = ChaCha8Rng::seed_from_u64(options.seed);
        self.rounds = Vec::new();
        self.fallback = None;

        if data.num_attributes() == 0 {
            warn!(
                "{}: no predictor attributes, using {} instead",
                LogitBoost::NAME, ZeroR::NAME,
            );
            self.fallback = Some(ZeroR::init().train(&data));
            self.num_classes = data.num_classes();
            self.data = Some(data);
            self.state = DriverState::Done;
            return Ok(());
        }

        let k = data.num_classes();
        let offset = options.offset;
        self.num_classes = k;
        self.ys = data.iter()
            .map(|instance| {
                let y = instance.class_value() as usize;
                (0..k).map(|j| {
                        if y == j { 1f64 - offset } else { offset / k as f64 }
                    })
                    .collect()
            })
            .collect();
        self.fs = vec![vec![0f64; k]; data.len()];
        self.probs = vec![vec![1f64 / k as f64; k]; data.len()];
        self.log_likelihood = log_likelihood(&self.ys, &self.probs, offset);
        self.weights = data.weights();
        self.sum_of_weights = utils::sum(&self.weights);
        debug!(
            "{}: initial log-likelihood {}",
            LogitBoost::NAME, self.log_likelihood,
        );

        self.data = Some(data);
        self.state = DriverState::Ready;
        Ok(())
    }


    fn step(&mut self) -> Result<ControlFlow<usize>> {
        check_can_step(LogitBoost::NAME, self.state)?;
        let config = self.config;
        let options = &config.options;
        if self.state == DriverState::Done
            || self.rounds.len() >= options.num_iterations
        {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.rounds.len()));
        }
        let round = self.rounds.len() + 1;

        let data = self.data.take()
            .ok_or_else(|| EnsembleError::State {
                learner: LogitBoost::NAME.to_string(),
                reason: "no training data".to_string(),
            })?;
        let result = self.perform_iteration(&data, round);
        self.data = Some(data);
        if let Err(e) = result {
            self.fail();
            return Err(e);
        }

        let previous = self.log_likelihood;
        self.log_likelihood = log_likelihood(&self.ys, &self.probs, options.offset);
        debug!(
            "{}: round {round}, log-likelihood {}",
            LogitBoost::NAME, self.log_likelihood,
        );

        let converged = (previous - self.log_likelihood).abs()
            < options.likelihood_threshold;
        if converged || self.rounds.len() >= options.num_iterations {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.rounds.len()));
        }
        self.state = DriverState::Stepping;
        Ok(ControlFlow::Continue(()))
    }


    fn finalize(&mut self) -> Result<LogitBoostModel> {
        check_can_finalize(LogitBoost::NAME, self.state)?;
        let config = self.config;
        let options = &config.options;

        let rounds = std::mem::take(&mut self.rounds);
        info!(
            "{}: {} rounds performed, log-likelihood {}",
            LogitBoost::NAME, rounds.len(), self.log_likelihood,
        );

        self.data = None;
        self.weights = Vec::new();
        self.ys = Vec::new();
        self.fs = Vec::new();
        self.probs = Vec::new();
        self.state = DriverState::Uninitialized;

        let model = LogitBoostModel::new(
            self.num_classes,
            options.shrinkage,
            rounds,
            self.fallback.take(),
        )
        .pool_size(options.pool_size)
        .num_threads(options.num_threads);
        Ok(model)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Instance, Schema};
    use approx::assert_abs_diff_eq;

    fn three_classes() -> Dataset {
        let schema = Schema::new(
            "three",
            vec![Attribute::numeric("x"), Attribute::numeric("z")],
            Attribute::nominal("y", ["a", "b", "c"]),
        ).unwrap();
        let instances = (0..30)
            .map(|i| {
                let x = i as f64;
                let z = ((i * 7) % 5) as f64;
                let y = (i / 10) as f64;
                Instance::new(vec![x, z], y)
            })
            .collect();
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn resampling_with_pruning_is_rejected() {
        let booster = LogitBoost::default()
            .use_resampling(true)
            .weight_threshold(90);
        let err = booster.train(&three_classes()).unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidParameter { .. }));
    }

    #[test]
    fn log_likelihood_decreases() {
        let data = three_classes();
        let booster = LogitBoost::default().num_iterations(5);
        let mut driver = booster.driver();
        driver.initialize(&data).unwrap();
        let initial = driver.log_likelihood();
        assert_abs_diff_eq!(initial, 3f64.ln(), epsilon = 1e-12);

        while driver.step().unwrap().is_continue() {}
        assert!(driver.log_likelihood() < initial);
        assert_eq!(driver.num_iterations_performed(), 5);

        let f = driver.finalize().unwrap();
        assert_eq!(f.models()[0].len(), 3);
        let dist = f.distribution(&data[0]).unwrap();
        assert_abs_diff_eq!(dist.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_eq!(f.classify(&data[0]).unwrap(), 0.0);
    }

    #[test]
    fn two_classes_fit_one_model_per_round() {
        let schema = Schema::new(
            "two",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = (0..8)
            .map(|i| Instance::new(vec![i as f64], (i / 4) as f64))
            .collect();
        let data = Dataset::from_instances(schema, instances).unwrap();
        let f = LogitBoost::default().num_iterations(3).train(&data).unwrap();
        assert!(f.models().iter().all(|round| round.len() == 1));
        let dist = f.distribution(&Instance::unlabeled(vec![7.0])).unwrap();
        assert!(dist[1] > dist[0]);
    }

    #[test]
    fn likelihood_threshold_stops_early() {
        let booster = LogitBoost::default()
            .num_iterations(50)
            .likelihood_threshold(f64::MAX);
        let f = booster.train(&three_classes()).unwrap();
        assert_eq!(f.num_iterations_performed(), 1);
    }
}
