//! Provides [`Bagging`] by Breiman, 1996.
use serde::{Serialize, Deserialize};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use fixedbitset::FixedBitSet;
use rayon::prelude::*;
use log::{debug, info};

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
use super::{BaggingModel, OutOfBag};


/// Options of [`Bagging`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaggingOptions {
    /// Number of bagged models.
    pub num_iterations: usize,
    /// Base seed. Round `i` draws its bag from a generator seeded
    /// with `seed + i`.
    pub seed: u64,
    /// Size of each bag as a percentage of the training data.
    pub bag_size_percent: u32,
    /// Estimate the error on the instances left out of each bag.
    /// Requires `bag_size_percent == 100`.
    pub calc_out_of_bag: bool,
    /// Keep the per-instance out-of-bag predictions.
    pub store_out_of_bag_predictions: bool,
    /// Represent duplicated instances of a bag by a single instance
    /// whose weight is the number of copies.
    /// Requires a weight-aware base learner.
    pub represent_copies_using_weights: bool,
    /// Number of threads training the rounds.
    pub num_execution_slots: usize,
}


impl Default for BaggingOptions {
    fn default() -> Self {
        Self {
            num_iterations: DEFAULT_NUM_ITERATIONS,
            seed: DEFAULT_SEED,
            bag_size_percent: DEFAULT_BAG_SIZE_PERCENT,
            calc_out_of_bag: false,
            store_out_of_bag_predictions: false,
            represent_copies_using_weights: false,
            num_execution_slots: DEFAULT_POOL_SIZE,
        }
    }
}


impl BaggingOptions {
    /// Checks every option.
    pub fn validate(&self) -> Result<()> {
        checker::check_at_least_one("num_iterations", self.num_iterations)?;
        checker::check_percentage("bag_size_percent", self.bag_size_percent)?;
        checker::check_at_least_one("num_execution_slots", self.num_execution_slots)?;
        if self.calc_out_of_bag && self.bag_size_percent != 100 {
            return Err(EnsembleError::invalid_parameter(
                "bag_size_percent",
                self.bag_size_percent,
                "bag size needs to be 100% if out-of-bag error is to be calculated",
            ));
        }
        Ok(())
    }
}


/// Defines `Bagging`.
///
/// Each round trains a fresh copy of the base learner
/// on a bootstrap sample of the training data.
/// The rounds are independent and run on a pool of
/// [`BaggingOptions::num_execution_slots`] threads.
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(data: &Dataset) -> Result<()> {
/// let bagging = Bagging::default()
///     .num_iterations(50)
///     .calc_out_of_bag(true);
/// let f = bagging.train(data)?;
/// println!("OOB error: {}", f.measure_out_of_bag_error());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Bagging {
    options: BaggingOptions,
    base: Box<dyn BaseLearner>,
}


impl Bagging {
    /// Registry identifier.
    pub const NAME: &'static str = "bagging";


    /// Construct a new instance of `Bagging` over `base`.
    pub fn init(base: Box<dyn BaseLearner>) -> Self {
        Self::with_options(BaggingOptions::default(), base)
    }


    /// Construct a new instance from its options.
    pub fn with_options(options: BaggingOptions, base: Box<dyn BaseLearner>)
        -> Self
    {
        Self { options, base }
    }


    /// Set the number of bagged models.
    pub fn num_iterations(mut self, num_iterations: usize) -> Self {
        self.options.num_iterations = num_iterations;
        self
    }


    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }


    /// Set the bag size as a percentage of the training data.
    pub fn bag_size_percent(mut self, percent: u32) -> Self {
        self.options.bag_size_percent = percent;
        self
    }


    /// Compute the out-of-bag error.
    pub fn calc_out_of_bag(mut self, flag: bool) -> Self {
        self.options.calc_out_of_bag = flag;
        self
    }


    /// Keep the per-instance out-of-bag predictions.
    pub fn store_out_of_bag_predictions(mut self, flag: bool) -> Self {
        self.options.store_out_of_bag_predictions = flag;
        self
    }


    /// Represent copies in a bag by instance weights.
    pub fn represent_copies_using_weights(mut self, flag: bool) -> Self {
        self.options.represent_copies_using_weights = flag;
        self
    }


    /// Set the number of training threads.
    pub fn num_execution_slots(mut self, slots: usize) -> Self {
        self.options.num_execution_slots = slots;
        self
    }


    /// The options of `self`.
    pub fn options(&self) -> &BaggingOptions {
        &self.options
    }


    fn check_setup(&self, data: &Dataset) -> Result<()> {
        self.options.validate()?;
        let base = self.base.as_ref();
        let capabilities = base.capabilities();
        if self.options.represent_copies_using_weights
            && !capabilities.weighted_instances
        {
            return Err(EnsembleError::incompatible(
                Self::NAME,
                format!(
                    "cannot represent copies using weights \
                    when {} does not handle weighted instances",
                    base.name(),
                ),
            ));
        }
        capabilities.check_class(base.name(), data.schema())
    }


    // The bag of round `round` and, for the out-of-bag estimate,
    // the instances it contains.
    fn bag(&self, data: &Dataset, weights: &[f64], round: usize)
        -> Result<(Dataset, Option<FixedBitSet>)>
    {
        let options = &self.options;
        let seed = options.seed.wrapping_add(round as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let represent = options.represent_copies_using_weights;

        if options.calc_out_of_bag {
            let mut in_bag = FixedBitSet::with_capacity(data.len());
            let bag = data.resample(&mut rng, weights, Some(&mut in_bag), represent)?;
            return Ok((bag, Some(in_bag)));
        }

        // At least one instance, however small the data.
        let bag_size = (data.len() * options.bag_size_percent as usize / 100).max(1);
        let bag = if bag_size < data.len() {
            // Copies can't be merged into weights before the bag is cut.
            let mut bag = data.resample(&mut rng, weights, None, false)?;
            bag.randomize(&mut rng);
            bag.subset(0..bag_size)
        } else {
            data.resample(&mut rng, weights, None, represent)?
        };
        Ok((bag, None))
    }


    /// Trains the bagged ensemble on `data`.
    pub fn train(&self, data: &Dataset) -> Result<BaggingModel> {
        self.check_setup(data)?;
        let options = &self.options;

        let data = data.delete_missing_class();
        checker::check_nonempty(&data)?;

        let base = self.base.as_ref();
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let learners = (0..options.num_iterations)
            .map(|_| {
                if base.capabilities().randomizable {
                    base.reseeded(rng.next_u64())
                } else {
                    base.fresh()
                }
            })
            .collect::<Vec<_>>();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.num_execution_slots)
            .build()
            .map_err(|e| EnsembleError::invalid_parameter(
                "num_execution_slots", options.num_execution_slots, &e.to_string()
            ))?;
        debug!(
            "{}: training {} rounds on {} threads",
            Self::NAME, options.num_iterations, options.num_execution_slots,
        );

        let weights = data.weights();
        let rounds = pool.install(|| {
            learners.par_iter()
                .enumerate()
                .map(|(i, learner)| {
                    let (bag, in_bag) = self.bag(&data, &weights, i)?;
                    let model = learner.fit(&bag)
                        .map_err(|e| e.in_round(i + 1))?;
                    Ok((model, in_bag))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let (models, in_bag): (Vec<Box<dyn Model>>, Vec<Option<FixedBitSet>>)
            = rounds.into_iter().unzip();

        let out_of_bag = if options.calc_out_of_bag {
            let in_bag = in_bag.into_iter().flatten().collect::<Vec<_>>();
            let oob = OutOfBag::evaluate(
                &data, &models, &in_bag, options.store_out_of_bag_predictions,
            )?;
            info!(
                "{}: out-of-bag error {} on {} instances",
                Self::NAME, oob.error, oob.num_evaluated,
            );
            Some(oob)
        } else {
            None
        };

        Ok(BaggingModel::new(
            base.name().to_string(),
            data.schema().class_is_numeric(),
            data.num_classes(),
            models,
            out_of_bag,
        ))
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<BaggingOptions>()?;
        options.validate()?;
        let base = registry.build_base(spec, Box::new(DecisionStump::init()))?;
        Ok(Box::new(Self::with_options(options, base)))
    }
}


impl Default for Bagging {
    fn default() -> Self {
        Self::init(Box::new(DecisionStump::init()))
    }
}


impl BaseLearner for Bagging {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = Vec::from([
            ("Base learner", self.base.name().to_string()),
            ("# Iterations", format!("{}", self.options.num_iterations)),
            ("Bag size (%)", format!("{}", self.options.bag_size_percent)),
            ("Out-of-bag", format!("{}", self.options.calc_out_of_bag)),
            ("Seed", format!("{}", self.options.seed)),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        let base = self.base.capabilities();
        Capabilities {
            weighted_instances: true,
            randomizable: true,
            incremental: false,
            batch_prediction: false,
            nominal_class: base.nominal_class,
            numeric_class: base.numeric_class,
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
