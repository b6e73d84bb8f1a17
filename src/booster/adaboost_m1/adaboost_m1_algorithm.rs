//! Provides [`AdaBoostM1`] by Freund & Schapire, 1996.
use serde::{Serialize, Deserialize};
use rand::{RngCore, SeedableRng};
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
    WeightedMajority,
    ZeroR,
    ZeroRModel,
    booster::core::{DriverState, check_can_step, check_can_finalize},
    common::{checker, utils},
    constants::*,
    error::{EnsembleError, Result},
};
use super::AdaBoostM1Model;

use std::ops::ControlFlow;


/// Options of [`AdaBoostM1`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaBoostM1Options {
    /// Maximal number of boosting rounds.
    pub num_iterations: usize,
    /// Seed of the random generator used for resampling
    /// and for seeding randomizable base learners.
    pub seed: u64,
    /// Percentage of the weight mass each round trains on.
    /// `100` trains on every instance.
    pub weight_threshold: u32,
    /// Train each round on a weighted resample
    /// instead of on reweighted instances.
    pub use_resampling: bool,
}


impl Default for AdaBoostM1Options {
    fn default() -> Self {
        Self {
            num_iterations: DEFAULT_NUM_ITERATIONS,
            seed: DEFAULT_SEED,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            use_resampling: false,
        }
    }
}


impl AdaBoostM1Options {
    /// Checks every option.
    pub fn validate(&self) -> Result<()> {
        checker::check_at_least_one("num_iterations", self.num_iterations)?;
        checker::check_percentage("weight_threshold", self.weight_threshold)?;
        Ok(())
    }
}


/// Defines `AdaBoostM1`.
///
/// Each round trains the base learner on the current weights,
/// measures its weighted error `eps` on the training data,
/// assigns it the weight `beta = ln((1 - eps) / eps)`,
/// and multiplies the weight of every misclassified instance
/// by `(1 - eps) / eps`.
/// Boosting stops after [`AdaBoostM1Options::num_iterations`] rounds,
/// or as soon as a round has error `0` or at least `0.5`.
/// A model from the first round is kept even if it stops boosting.
///
/// The base learner is trained on a weighted resample
/// if resampling is requested
/// or if it does not handle instance weights.
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(data: &Dataset) -> Result<()> {
/// let booster = AdaBoostM1::init(Box::new(DecisionStump::init()))
///     .num_iterations(50)
///     .weight_threshold(90);
///
/// let f = booster.train(data)?;
/// println!("{f}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdaBoostM1 {
    options: AdaBoostM1Options,
    base: Box<dyn BaseLearner>,
}


impl AdaBoostM1 {
    /// Registry identifier.
    pub const NAME: &'static str = "adaboost_m1";


    /// Construct a new instance of `AdaBoostM1`
    /// that boosts `base` with default options.
    pub fn init(base: Box<dyn BaseLearner>) -> Self {
        Self::with_options(AdaBoostM1Options::default(), base)
    }


    /// Construct a new instance of `AdaBoostM1` from its options.
    pub fn with_options(
        options: AdaBoostM1Options,
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


    /// The options of `self`.
    pub fn options(&self) -> &AdaBoostM1Options {
        &self.options
    }


    /// The base learner.
    pub fn base(&self) -> &dyn BaseLearner {
        self.base.as_ref()
    }


    /// Returns a driver that boosts round by round.
    pub fn driver(&self) -> AdaBoostM1Driver<'_> {
        AdaBoostM1Driver::new(self)
    }


    /// Runs every round on `data` and returns the boosted model.
    pub fn train(&self, data: &Dataset) -> Result<AdaBoostM1Model> {
        self.driver().run(data)
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<AdaBoostM1Options>()?;
        options.validate()?;
        let base = registry.build_base(spec, Box::new(DecisionStump::init()))?;
        Ok(Box::new(Self::with_options(options, base)))
    }
}


impl Default for AdaBoostM1 {
    fn default() -> Self {
        Self::init(Box::new(DecisionStump::init()))
    }
}


impl BaseLearner for AdaBoostM1 {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = Vec::from([
            ("Base learner", self.base.name().to_string()),
            ("# Iterations", format!("{}", self.options.num_iterations)),
            ("Weight threshold", format!("{}", self.options.weight_threshold)),
            ("Resampling", format!("{}", self.options.use_resampling)),
            ("Seed", format!("{}", self.options.seed)),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: true,
            incremental: false,
            batch_prediction: false,
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


/// Runs [`AdaBoostM1`] round by round.
///
/// The driver owns the working copy of the training data
/// and the instance weights until [`Booster::finalize`].
pub struct AdaBoostM1Driver<'a> {
    config: &'a AdaBoostM1,
    state: DriverState,

    // Training data without instances whose class is missing.
    data: Option<Dataset>,

    // Current instance weights, indexed as `data`.
    weights: Vec<f64>,

    resampling: bool,
    rng: ChaCha8Rng,

    ensemble: WeightedMajority,
    fallback: Option<ZeroRModel>,
    num_classes: usize,

    round: usize,
    last_error: Option<f64>,
}


impl<'a> AdaBoostM1Driver<'a> {
    fn new(config: &'a AdaBoostM1) -> Self {
        Self {
            config,
            state: DriverState::Uninitialized,
            data: None,
            weights: Vec::new(),
            resampling: false,
            rng: ChaCha8Rng::seed_from_u64(config.options.seed),
            ensemble: WeightedMajority::new(),
            fallback: None,
            num_classes: 0,
            round: 0,
            last_error: None,
        }
    }


    /// Number of models kept so far.
    pub fn num_iterations_performed(&self) -> usize {
        self.ensemble.len()
    }


    /// Weights of the models kept so far.
    pub fn betas(&self) -> &[f64] {
        &self.ensemble.weights[..]
    }


    // Trains one model on `training`.
    // With resampling, retries while the model fits `full` perfectly.
    // Returns the model and its per-instance mistakes on `full`.
    fn fit_round(&mut self, training: &Dataset, full: &Dataset)
        -> Result<(Box<dyn Model>, Vec<bool>)>
    {
        let config = self.config;
        let base = config.base.as_ref();
        if self.resampling {
            let weights = training.weights();
            let mut attempts = 0;
            loop {
                let sample = training.resample_with_weights(&mut self.rng, &weights)?;
                let model = base.fit(&sample)?;
                let mistakes = mistakes_of(model.as_ref(), full)?;
                attempts += 1;

                let eps = weighted_error(&mistakes, &self.weights);
                if !utils::eq(eps, 0f64) || attempts >= MAX_NUM_RESAMPLING_ITERATIONS {
                    return Ok((model, mistakes));
                }
                debug!(
                    "{}: round {} fits perfectly, resampling again ({attempts})",
                    AdaBoostM1::NAME, self.round,
                );
            }
        }

        let model = if base.capabilities().randomizable {
            base.reseeded(self.rng.next_u64()).fit(training)?
        } else {
            base.fit(training)?
        };
        let mistakes = mistakes_of(model.as_ref(), full)?;
        Ok((model, mistakes))
    }
}


impl Booster for AdaBoostM1Driver<'_> {
    type Output = AdaBoostM1Model;


    fn name(&self) -> &str {
        "AdaBoostM1"
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
        self.last_error
    }


    fn initialize(&mut self, data: &Dataset) -> Result<()> {
        let config = self.config;
        let options = &config.options;
        options.validate()?;

        checker::check_nominal_class(AdaBoostM1::NAME, data)?;
        let base = config.base.as_ref();
        base.capabilities().check_class(base.name(), data.schema())?;

        let data = data.delete_missing_class();
        checker::check_nonempty(&data)?;

        self.resampling = options.use_resampling
            || !base.capabilities().weighted_instances;
        self.rng = ChaCha8Rng::seed_from_u64(options.seed);
        self.weights = data.weights();
        if self.resampling {
            utils::normalize(&mut self.weights);
        }
        self.num_classes = data.num_classes();
        self.ensemble = WeightedMajority::new();
        self.fallback = None;
        self.round = 0;
        self.last_error = None;

        if data.num_attributes() == 0 {
            warn!(
                "{}: no predictor attributes, using {} instead",
                AdaBoostM1::NAME, ZeroR::NAME,
            );
            self.fallback = Some(ZeroR::init().train(&data));
            self.state = DriverState::Done;
        } else {
            self.state = DriverState::Ready;
        }
        self.data = Some(data);
        Ok(())
    }


    fn step(&mut self) -> Result<ControlFlow<usize>> {
        check_can_step(AdaBoostM1::NAME, self.state)?;
        let num_iterations = self.config.options.num_iterations;
        if self.state == DriverState::Done || self.round >= num_iterations {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.ensemble.len()));
        }
        self.round += 1;
        let round = self.round;

        let data = self.data.take()
            .ok_or_else(|| EnsembleError::State {
                learner: AdaBoostM1::NAME.to_string(),
                reason: "no training data".to_string(),
            })?;
        let result = self.boost(&data, round);
        self.data = Some(data);
        if result.is_err() {
            self.data = None;
            self.ensemble = WeightedMajority::new();
            self.state = DriverState::Failed;
        }
        result
    }


    fn finalize(&mut self) -> Result<AdaBoostM1Model> {
        check_can_finalize(AdaBoostM1::NAME, self.state)?;

        let ensemble = std::mem::take(&mut self.ensemble);
        let fallback = self.fallback.take();
        info!(
            "{}: {} rounds performed, final weighted error {:?}",
            AdaBoostM1::NAME, ensemble.len(), self.last_error,
        );

        self.data = None;
        self.weights = Vec::new();
        self.state = DriverState::Uninitialized;

        Ok(AdaBoostM1Model::new(self.num_classes, ensemble, fallback))
    }
}


impl AdaBoostM1Driver<'_> {
    fn boost(&mut self, data: &Dataset, round: usize)
        -> Result<ControlFlow<usize>>
    {
        let snapshot = data.with_weights(&self.weights)?;
        let threshold = self.config.options.weight_threshold;
        let training = if threshold < 100 {
            let selected = snapshot.select_weight_quantile(threshold as f64 / 100f64);
            debug!(
                "{}: round {round} trains on {} of {} instances",
                AdaBoostM1::NAME, selected.len(), snapshot.len(),
            );
            selected
        } else {
            snapshot
        };

        let (model, mistakes) = self.fit_round(&training, data)
            .map_err(|e| e.in_round(round))?;

        let eps = weighted_error(&mistakes, &self.weights);
        self.last_error = Some(eps);
        debug!("{}: round {round}, weighted error {eps}", AdaBoostM1::NAME);

        if utils::gr_or_eq(eps, 0.5) || utils::eq(eps, 0f64) {
            if self.ensemble.is_empty() {
                self.ensemble.push(0f64, model);
            }
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.ensemble.len()));
        }

        let reweight = (1f64 - eps) / eps;
        let beta = reweight.ln();
        self.ensemble.push(beta, model);
        debug!("{}: round {round}, beta {beta}", AdaBoostM1::NAME);

        let old_sum = utils::sum(&self.weights);
        self.weights.par_iter_mut()
            .zip(mistakes.par_iter())
            .filter(|(_, wrong)| **wrong)
            .for_each(|(w, _)| { *w *= reweight; });
        let new_sum = utils::sum(&self.weights);
        if new_sum > 0f64 {
            self.weights.iter_mut()
                .for_each(|w| { *w *= old_sum / new_sum; });
        }

        if self.ensemble.len() >= self.config.options.num_iterations {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.ensemble.len()));
        }
        self.state = DriverState::Stepping;
        Ok(ControlFlow::Continue(()))
    }
}


// `true` for every instance `model` misclassifies.
// A missing prediction counts as a mistake.
fn mistakes_of(model: &dyn Model, data: &Dataset) -> Result<Vec<bool>> {
    data.instances()
        .par_iter()
        .map(|instance| {
            let prediction = model.classify(instance)?;
            Ok(prediction != instance.class_value())
        })
        .collect()
}


// Weight of the mistakes over the total weight.
// Zero if the total weight is zero.
fn weighted_error(mistakes: &[bool], weights: &[f64]) -> f64 {
    let total = utils::sum(weights);
    if total <= 0f64 {
        return 0f64;
    }
    let wrong = mistakes.iter()
        .zip(weights)
        .filter(|(m, _)| **m)
        .map(|(_, w)| *w)
        .sum::<f64>();
    wrong / total
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Instance, Schema};
    use approx::assert_abs_diff_eq;

    // Two interleaved classes on one attribute:
    // no single stump is perfect.
    fn interleaved() -> Dataset {
        let schema = Schema::new(
            "interleaved",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let labels = [0, 0, 1, 1, 0, 0, 1, 1, 1, 0];
        let instances = labels.iter()
            .enumerate()
            .map(|(i, &y)| Instance::new(vec![i as f64], y as f64))
            .collect();
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn betas_are_nonnegative() {
        let booster = AdaBoostM1::default().num_iterations(5);
        let f = booster.train(&interleaved()).unwrap();
        assert!(f.num_iterations_performed() >= 1);
        assert!(f.betas().iter().all(|beta| *beta >= 0f64));
    }

    #[test]
    fn perfect_first_round_is_kept() {
        let schema = Schema::new(
            "separable",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![0.0], 0.0),
            Instance::new(vec![1.0], 0.0),
            Instance::new(vec![2.0], 1.0),
            Instance::new(vec![3.0], 1.0),
        ];
        let data = Dataset::from_instances(schema, instances).unwrap();

        let booster = AdaBoostM1::default();
        let mut driver = booster.driver();
        driver.initialize(&data).unwrap();
        assert_eq!(driver.step().unwrap(), ControlFlow::Break(1));
        assert_eq!(driver.state(), DriverState::Done);
        assert_eq!(driver.step().unwrap(), ControlFlow::Break(1));

        let f = driver.finalize().unwrap();
        assert_eq!(f.betas(), &[0.0]);
        assert_eq!(f.classify(&Instance::unlabeled(vec![3.0])).unwrap(), 1.0);
    }

    #[test]
    fn class_only_data_falls_back_to_zero_r() {
        let schema = Schema::new(
            "class_only",
            vec![],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![], 1.0),
            Instance::new(vec![], 1.0),
            Instance::new(vec![], 0.0),
        ];
        let data = Dataset::from_instances(schema, instances).unwrap();

        let booster = AdaBoostM1::default();
        let mut driver = booster.driver();
        driver.initialize(&data).unwrap();
        assert_eq!(driver.state(), DriverState::Done);
        let f = driver.finalize().unwrap();
        assert_eq!(f.num_iterations_performed(), 0);
        // counts: [1 + 1, 1 + 2]
        let dist = f.distribution(&Instance::unlabeled(vec![])).unwrap();
        assert_abs_diff_eq!(dist[0], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(dist[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn numeric_class_is_rejected() {
        let schema = Schema::new(
            "numeric",
            vec![Attribute::numeric("x")],
            Attribute::numeric("y"),
        ).unwrap();
        let data = Dataset::from_instances(
            schema, vec![Instance::new(vec![0.0], 1.0)]
        ).unwrap();
        let err = AdaBoostM1::default().train(&data).unwrap_err();
        assert!(matches!(err, EnsembleError::IncompatibleData { .. }));
    }

    #[test]
    fn step_before_initialize_is_an_error() {
        let booster = AdaBoostM1::default();
        let mut driver = booster.driver();
        assert!(matches!(driver.step(), Err(EnsembleError::State { .. })));
    }

    #[test]
    fn resampling_is_reproducible() {
        let data = interleaved();
        let booster = AdaBoostM1::default()
            .use_resampling(true)
            .num_iterations(4)
            .seed(7);
        let f = booster.train(&data).unwrap();
        let g = booster.train(&data).unwrap();
        assert_eq!(f.betas(), g.betas());
    }
}
