//! Provides [`AdditiveRegression`] by Friedman, 2002.
use serde::{Serialize, Deserialize};
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
    booster::core::{DriverState, check_can_step, check_can_finalize},
    common::checker,
    constants::*,
    error::{EnsembleError, Result},
};
use super::AdditiveRegressionModel;

use std::ops::ControlFlow;


/// Options of [`AdditiveRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdditiveRegressionOptions {
    /// Maximal number of rounds.
    pub num_iterations: usize,
    /// Learning rate applied to every base model.
    pub shrinkage: f64,
    /// Start from the median and minimize absolute residuals
    /// instead of starting from the mean and minimizing squared residuals.
    pub minimize_absolute_error: bool,
}


impl Default for AdditiveRegressionOptions {
    fn default() -> Self {
        Self {
            num_iterations: DEFAULT_NUM_ITERATIONS,
            shrinkage: DEFAULT_SHRINKAGE,
            minimize_absolute_error: false,
        }
    }
}


impl AdditiveRegressionOptions {
    /// Checks every option.
    pub fn validate(&self) -> Result<()> {
        checker::check_at_least_one("num_iterations", self.num_iterations)?;
        checker::check_positive("shrinkage", self.shrinkage)?;
        Ok(())
    }
}


/// Defines `AdditiveRegression`.
///
/// The model starts from a constant, the weighted mean of the targets
/// (or their median when minimizing absolute error).
/// Each round fits the base learner to the current residuals
/// and subtracts `shrinkage` times its predictions from them.
/// Boosting stops after [`AdditiveRegressionOptions::num_iterations`]
/// rounds, once a round improves the residual error by at most
/// [`SMALL`], or once the residual error itself is at most `SMALL`.
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// # fn run(data: &Dataset) -> Result<()> {
/// let booster = AdditiveRegression::default()
///     .num_iterations(100)
///     .shrinkage(0.1);
/// let f = booster.train(data)?;
/// println!("{} rounds", f.measure_num_iterations());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdditiveRegression {
    options: AdditiveRegressionOptions,
    base: Box<dyn BaseLearner>,
}


impl AdditiveRegression {
    /// Registry identifier.
    pub const NAME: &'static str = "additive_regression";


    /// Construct a new instance of `AdditiveRegression`
    /// over the regression learner `base`.
    pub fn init(base: Box<dyn BaseLearner>) -> Self {
        Self::with_options(AdditiveRegressionOptions::default(), base)
    }


    /// Construct a new instance from its options.
    pub fn with_options(
        options: AdditiveRegressionOptions,
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


    /// Set the shrinkage.
    pub fn shrinkage(mut self, shrinkage: f64) -> Self {
        self.options.shrinkage = shrinkage;
        self
    }


    /// Minimize absolute instead of squared error.
    pub fn minimize_absolute_error(mut self, flag: bool) -> Self {
        self.options.minimize_absolute_error = flag;
        self
    }


    /// The options of `self`.
    pub fn options(&self) -> &AdditiveRegressionOptions {
        &self.options
    }


    /// Returns a driver that fits round by round.
    pub fn driver(&self) -> AdditiveRegressionDriver<'_> {
        AdditiveRegressionDriver::new(self)
    }


    /// Runs every round on `data` and returns the additive model.
    pub fn train(&self, data: &Dataset) -> Result<AdditiveRegressionModel> {
        self.driver().run(data)
    }


    pub(crate) fn from_spec(spec: &LearnerSpec, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        let options = spec.parse_options::<AdditiveRegressionOptions>()?;
        options.validate()?;
        let base = registry.build_base(spec, Box::new(DecisionStump::init()))?;
        Ok(Box::new(Self::with_options(options, base)))
    }
}


impl Default for AdditiveRegression {
    fn default() -> Self {
        Self::init(Box::new(DecisionStump::init()))
    }
}


impl BaseLearner for AdditiveRegression {
    fn name(&self) -> &str {
        Self::NAME
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let loss = if self.options.minimize_absolute_error {
            "absolute"
        } else {
            "squared"
        };
        let info = Vec::from([
            ("Base learner", self.base.name().to_string()),
            ("# Iterations", format!("{}", self.options.num_iterations)),
            ("Shrinkage", format!("{}", self.options.shrinkage)),
            ("Loss", loss.to_string()),
        ]);
        Some(info)
    }


    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: true,
            randomizable: false,
            incremental: false,
            batch_prediction: false,
            nominal_class: false,
            numeric_class: true,
        }
    }


    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>> {
        Ok(Box::new(self.train(data)?))
    }


    fn fresh(&self) -> Box<dyn BaseLearner> {
        Box::new(self.clone())
    }
}


/// Runs [`AdditiveRegression`] round by round.
pub struct AdditiveRegressionDriver<'a> {
    config: &'a AdditiveRegression,
    state: DriverState,

    data: Option<Dataset>,
    residuals: Vec<f64>,

    initial_prediction: f64,
    suitable: bool,
    models: Vec<Box<dyn Model>>,

    // Residual error after the last round, and its last improvement.
    error: f64,
    diff: f64,
}


impl<'a> AdditiveRegressionDriver<'a> {
    fn new(config: &'a AdditiveRegression) -> Self {
        Self {
            config,
            state: DriverState::Uninitialized,
            data: None,
            residuals: Vec::new(),
            initial_prediction: 0f64,
            suitable: false,
            models: Vec::new(),
            error: f64::NAN,
            diff: f64::MAX,
        }
    }


    /// The current residuals.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals[..]
    }


    /// Weighted residual error, squared or absolute.
    pub fn residual_error(&self) -> f64 {
        self.error
    }


    fn residual_error_of(&self, data: &Dataset) -> f64 {
        let absolute = self.config.options.minimize_absolute_error;
        data.iter()
            .zip(&self.residuals)
            .map(|(instance, r)| {
                let loss = if absolute { r.abs() } else { r * r };
                instance.weight() * loss
            })
            .sum::<f64>()
    }


    fn should_stop(&self) -> bool {
        !self.suitable
            || self.models.len() >= self.config.options.num_iterations
            || self.diff <= SMALL
            || self.error <= SMALL
    }


    // Residuals keep the values of the last completed round.
    fn fail(&mut self) {
        self.data = None;
        self.models.clear();
        self.state = DriverState::Failed;
    }


    /// Fits one model to the residuals.
    /// The residuals change only once every prediction is available.
    fn boost_round(&mut self) -> Result<ControlFlow<usize>> {
        let round = self.models.len() + 1;
        let data = self.data.as_ref()
            .ok_or_else(|| EnsembleError::State {
                learner: AdditiveRegression::NAME.to_string(),
                reason: "no training data".to_string(),
            })?;

        let training = data.with_class_values(&self.residuals)?;
        let model = self.config.base.fit(&training)
            .map_err(|e| e.in_round(round))?;

        let predictions = data.instances()
            .par_iter()
            .map(|instance| -> Result<f64> {
                let prediction = model.classify(instance)?;
                if prediction.is_nan() {
                    return Err(EnsembleError::unassigned(AdditiveRegression::NAME));
                }
                Ok(prediction)
            })
            .collect::<Result<Vec<_>>>()?;

        let shrinkage = self.config.options.shrinkage;
        self.residuals.iter_mut()
            .zip(predictions)
            .for_each(|(r, prediction)| { *r -= shrinkage * prediction; });
        self.models.push(model);

        let error = self.residual_error_of(data);
        self.diff = self.error - error;
        self.error = error;
        debug!(
            "{}: round {round}, residual error {error}",
            AdditiveRegression::NAME,
        );

        if self.should_stop() {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.models.len()));
        }
        self.state = DriverState::Stepping;
        Ok(ControlFlow::Continue(()))
    }
}


impl Booster for AdditiveRegressionDriver<'_> {
    type Output = AdditiveRegressionModel;


    fn name(&self) -> &str {
        "AdditiveRegression"
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
        if self.error.is_nan() { None } else { Some(self.error) }
    }


    fn initialize(&mut self, data: &Dataset) -> Result<()> {
        let config = self.config;
        config.options.validate()?;

        checker::check_numeric_class(AdditiveRegression::NAME, data)?;
        let base = config.base.as_ref();
        base.capabilities().check_class(base.name(), data.schema())?;

        let data = data.delete_missing_class();
        checker::check_nonempty(&data)?;

        self.initial_prediction = if config.options.minimize_absolute_error {
            data.kth_smallest_class_value((data.len() - 1) / 2)
                .ok_or(EnsembleError::EmptyDataset)?
        } else {
            data.mean_of_class()
        };
        self.models = Vec::new();
        self.diff = f64::MAX;

        self.suitable = data.num_attributes() > 0;
        if !self.suitable {
            warn!(
                "{}: no predictor attributes, predicting the constant {}",
                AdditiveRegression::NAME, self.initial_prediction,
            );
        }

        let init = self.initial_prediction;
        self.residuals = data.iter()
            .map(|instance| instance.class_value() - init)
            .collect();
        self.error = self.residual_error_of(&data);
        debug!(
            "{}: initial prediction {init}, residual error {}",
            AdditiveRegression::NAME, self.error,
        );

        self.data = Some(data);
        self.state = if self.suitable {
            DriverState::Ready
        } else {
            DriverState::Done
        };
        Ok(())
    }


    fn step(&mut self) -> Result<ControlFlow<usize>> {
        check_can_step(AdditiveRegression::NAME, self.state)?;
        if self.state == DriverState::Done || self.should_stop() {
            self.state = DriverState::Done;
            return Ok(ControlFlow::Break(self.models.len()));
        }
        let flow = self.boost_round();
        if flow.is_err() {
            self.fail();
        }
        flow
    }


    fn finalize(&mut self) -> Result<AdditiveRegressionModel> {
        check_can_finalize(AdditiveRegression::NAME, self.state)?;
        let models = std::mem::take(&mut self.models);
        info!(
            "{}: {} rounds performed, residual error {}",
            AdditiveRegression::NAME, models.len(), self.error,
        );

        self.data = None;
        self.residuals = Vec::new();
        self.state = DriverState::Uninitialized;

        Ok(AdditiveRegressionModel::new(
            self.initial_prediction,
            self.config.options.shrinkage,
            models,
            self.suitable,
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Instance, Schema, ZeroR};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn step_function() -> Dataset {
        let schema = Schema::new(
            "step",
            vec![Attribute::numeric("x")],
            Attribute::numeric("y"),
        ).unwrap();
        let instances = (0..8)
            .map(|i| {
                let y = if i < 4 { 1.0 } else { 5.0 };
                Instance::new(vec![i as f64], y)
            })
            .collect();
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn perfect_fit_stops_after_one_round() {
        let data = step_function();
        let booster = AdditiveRegression::default().num_iterations(10);
        let mut driver = booster.driver();
        driver.initialize(&data).unwrap();
        // Mean 3, residuals -2 and 2.
        assert_abs_diff_eq!(driver.residual_error(), 32.0, epsilon = 1e-12);

        assert_eq!(driver.step().unwrap(), ControlFlow::Break(1));
        assert!(driver.residual_error() < 1e-12);

        let f = driver.finalize().unwrap();
        assert_eq!(f.measure_num_iterations(), 1);
        assert_abs_diff_eq!(f.classify(&data[0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.classify(&data[7]).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn no_improvement_stops() {
        let booster = AdditiveRegression::init(Box::new(ZeroR::init()));
        let f = booster.train(&step_function()).unwrap();
        // ZeroR fits the mean of the residuals, which is zero.
        assert_eq!(f.measure_num_iterations(), 1);
    }

    #[test]
    fn median_start_for_absolute_error() {
        let schema = Schema::new(
            "abs",
            vec![],
            Attribute::numeric("y"),
        ).unwrap();
        let instances = [4.0, 1.0, 3.0, 100.0]
            .into_iter()
            .map(|y| Instance::new(vec![], y))
            .collect();
        let data = Dataset::from_instances(schema, instances).unwrap();
        let f = AdditiveRegression::default()
            .minimize_absolute_error(true)
            .train(&data)
            .unwrap();
        assert_eq!(f.measure_num_iterations(), 0);
        assert_eq!(f.classify(&Instance::unlabeled(vec![])).unwrap(), 3.0);
    }

    // Predicts -1 left of `x = 4` and +1 right of it.
    // From the second fit on, the right side is unassigned.
    #[derive(Debug, Clone, Default)]
    struct Scripted {
        fits: Arc<AtomicUsize>,
    }

    #[derive(Debug)]
    struct ScriptedModel {
        broken: bool,
    }

    impl Model for ScriptedModel {
        fn learner(&self) -> &str {
            "scripted"
        }

        fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
            let y = match (instance.value(0) < 4.0, self.broken) {
                (true, _) => -1.0,
                (false, false) => 1.0,
                (false, true) => f64::NAN,
            };
            Ok(vec![y])
        }

        fn to_value(&self) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    impl BaseLearner for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                weighted_instances: true,
                numeric_class: true,
                ..Capabilities::default()
            }
        }

        fn fit(&self, _data: &Dataset) -> Result<Box<dyn Model>> {
            let n = self.fits.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedModel { broken: n >= 1 }))
        }

        fn fresh(&self) -> Box<dyn BaseLearner> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn unassigned_prediction_fails_the_driver() {
        let data = step_function();
        let booster = AdditiveRegression::init(Box::new(Scripted::default()))
            .num_iterations(5);
        let mut driver = booster.driver();
        driver.initialize(&data).unwrap();

        assert!(driver.step().unwrap().is_continue());
        let residuals = driver.residuals().to_vec();
        assert_eq!(residuals, vec![-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0]);

        let err = driver.step().unwrap_err();
        assert!(matches!(err, EnsembleError::UnassignedClass { .. }));
        assert_eq!(driver.state(), DriverState::Failed);
        assert_eq!(driver.residuals(), &residuals[..]);

        assert!(matches!(driver.step(), Err(EnsembleError::State { .. })));
        assert!(matches!(driver.finalize(), Err(EnsembleError::State { .. })));

        // A new run starts from scratch.
        driver.initialize(&data).unwrap();
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn nominal_class_is_rejected() {
        let schema = Schema::new(
            "nominal",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let data = Dataset::from_instances(
            schema, vec![Instance::new(vec![0.0], 1.0)]
        ).unwrap();
        let err = AdditiveRegression::default().train(&data).unwrap_err();
        assert!(matches!(err, EnsembleError::IncompatibleData { .. }));
    }
}
