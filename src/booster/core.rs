//! Provides `Booster` trait.

use crate::{
    Dataset,
    error::{EnsembleError, Result},
};

use std::ops::ControlFlow;


/// Life cycle of an iterative driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// [`Booster::initialize`] has not been called yet.
    Uninitialized,
    /// Initialized, no round performed yet.
    Ready,
    /// At least one round performed, more may follow.
    Stepping,
    /// A stopping criterion was met.
    /// Further calls to [`Booster::step`] do nothing.
    Done,
    /// A round failed. The working state is discarded,
    /// and only [`Booster::initialize`] is accepted.
    Failed,
}


/// The trait [`Booster`] defines the framework shared by
/// the iterative ensembles of this crate.
///
/// 1. [`Booster::initialize`] validates the data and sets up
///    the working state (weights, residuals, pseudo-responses).
/// 2. [`Booster::step`] performs exactly one round.
///    It returns `ControlFlow::Continue(())` if another round may follow,
///    and `ControlFlow::Break(n)` once a stopping criterion is met,
///    where `n` is the number of rounds kept.
/// 3. [`Booster::finalize`] drops the working state
///    and returns the trained model.
///
/// # Required Methods
/// - [`Booster::name`]
/// - [`Booster::state`]
/// - [`Booster::initialize`]
/// - [`Booster::step`]
/// - [`Booster::finalize`]
/// - [`Booster::info`] ... optional.
/// - [`Booster::objective`] ... optional.
///
/// # Provided Methods
/// - [`Booster::run`]
pub trait Booster {
    /// The model output by the driver.
    type Output;


    /// Returns the name of the boosting algorithm.
    fn name(&self) -> &str;


    /// Returns the information of boosting algorithm as `String`.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// Current state of the driver.
    fn state(&self) -> DriverState;


    /// The objective value after the last round
    /// (weighted error, negative log-likelihood, residual error, ...).
    fn objective(&self) -> Option<f64> {
        None
    }


    /// A main function that runs the whole protocol.
    fn run(&mut self, data: &Dataset) -> Result<Self::Output> {
        self.initialize(data)?;

        while self.step()?.is_continue() {}

        self.finalize()
    }


    /// Pre-processing for `self`.
    fn initialize(&mut self, data: &Dataset) -> Result<()>;


    /// Boosting step per iteration.
    fn step(&mut self) -> Result<ControlFlow<usize>>;


    /// Post-processing.
    fn finalize(&mut self) -> Result<Self::Output>;
}


/// Returns an error unless `state` allows a call to `step`.
pub(crate) fn check_can_step(name: &str, state: DriverState) -> Result<()> {
    match state {
        DriverState::Uninitialized => Err(EnsembleError::State {
            learner: name.to_string(),
            reason: "step called before initialize".to_string(),
        }),
        DriverState::Failed => Err(failed(name)),
        _ => Ok(()),
    }
}


/// Returns an error unless `state` allows a call to `finalize`.
pub(crate) fn check_can_finalize(name: &str, state: DriverState)
    -> Result<()>
{
    match state {
        DriverState::Uninitialized => Err(EnsembleError::State {
            learner: name.to_string(),
            reason: "finalize called before initialize".to_string(),
        }),
        DriverState::Failed => Err(failed(name)),
        _ => Ok(()),
    }
}


fn failed(name: &str) -> EnsembleError {
    EnsembleError::State {
        learner: name.to_string(),
        reason: "a previous round failed, initialize again".to_string(),
    }
}
