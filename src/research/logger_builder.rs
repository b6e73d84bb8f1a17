use crate::{
    Dataset,
    error::{EnsembleError, Result},
};
use super::logger::{Logger, DEFAULT_ROUND, DEFAULT_TIMELIMIT_MILLIS};


/// `LoggerBuilder` is a struct to construct [`Logger`].
/// You need to specify the followings:
///
/// - Booster (a driver returned by e.g. [`AdaBoostM1::driver`](crate::AdaBoostM1::driver)),
/// - Training examples,
/// - Time limit for force quit, and
/// - Round (The log text is shown for every **round** you specified).
///
/// # Example
/// ```no_run
/// use meta_ensembles::prelude::*;
/// use meta_ensembles::research::LoggerBuilder;
///
/// # fn run(train: &Dataset) -> Result<()> {
/// let adaboost = AdaBoostM1::default().num_iterations(100);
///
/// let mut logger = LoggerBuilder::new()
///     .booster(adaboost.driver())
///     .train_sample(train)
///     .time_limit_as_secs(300)
///     .print_every(10)
///     .build()?;
///
/// let f = logger.run_with_csv("output.csv")?;
/// # Ok(())
/// # }
/// ```
pub struct LoggerBuilder<'a, B> {
    booster: Option<B>,
    train: Option<&'a Dataset>,
    time_limit: u128,
    round: usize,
}


impl<'a, B> LoggerBuilder<'a, B> {
    /// Construct a new instance of `LoggerBuilder.`
    pub fn new() -> Self {
        Self {
            booster: None,
            train: None,
            time_limit: DEFAULT_TIMELIMIT_MILLIS,
            round: DEFAULT_ROUND,
        }
    }


    /// Set the boosting algorithm.
    pub fn booster(mut self, booster: B) -> Self {
        self.booster = Some(booster);
        self
    }


    /// Set the training sample.
    pub fn train_sample(mut self, train: &'a Dataset) -> Self {
        self.train = Some(train);
        self
    }


    /// Set the time limit for boosting algorithm as milliseconds.
    /// If the boosting algorithm reaches this limit,
    /// breaks immediately.
    #[inline(always)]
    pub fn time_limit_as_millis(mut self, time_limit: u128) -> Self {
        self.time_limit = time_limit;
        self
    }


    /// Set the time limit for boosting algorithm as seconds.
    #[inline(always)]
    pub fn time_limit_as_secs(mut self, time_limit: u64) -> Self {
        self.time_limit = (time_limit as u128).saturating_mul(1_000);
        self
    }


    /// Set the time limit for boosting algorithm as minutes.
    #[inline(always)]
    pub fn time_limit_as_mins(mut self, time_limit: u64) -> Self {
        self.time_limit = (time_limit as u128).saturating_mul(60_000);
        self
    }


    /// Set the interval to print the current status.
    /// If you don't want to print the log,
    /// set `usize::MAX`.
    #[inline(always)]
    pub fn print_every(mut self, round: usize) -> Self {
        self.round = round;
        self
    }


    /// Build [`Logger`] from the given components.
    pub fn build(self) -> Result<Logger<'a, B>> {
        let booster = self.booster
            .ok_or_else(|| missing("booster"))?;
        let train = self.train
            .ok_or_else(|| missing("train_sample"))?;

        Ok(Logger {
            booster,
            train,
            time_limit: self.time_limit,
            round: self.round,
            trace: Vec::new(),
        })
    }
}


impl<B> Default for LoggerBuilder<'_, B> {
    fn default() -> Self {
        Self::new()
    }
}


fn missing(component: &str) -> EnsembleError {
    EnsembleError::invalid_parameter(component, "none", "is not specified")
}
